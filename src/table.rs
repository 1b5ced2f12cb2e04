use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value read from a sheet.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_nan(),
        }
    }

    /// Numeric view of the cell. Text that parses as a number counts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Text view of the cell. Whole numbers print without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Empty => None,
            Value::Text(s) if s.trim().is_empty() => None,
            Value::Text(s) => Some(s.trim().to_string()),
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Value::Number(n) => Some(n.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A rectangular sheet: a header row and data rows of equal width.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    /// Builder-style `push_row` used mostly by tests and fixtures.
    pub fn with_row<V: Into<Value>>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        self.push_row(row.into_iter().map(Into::into).collect());
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Required columns that this table does not carry, in the given order.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    /// First row whose `column` reads as `text`.
    pub fn find_row(&self, column: &str, text: &str) -> Option<Row<'_>> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .position(|r| r[idx].as_text().as_deref() == Some(text))
            .map(|index| Row { table: self, index })
    }

    /// Distinct non-empty values of a column, in order of first appearance.
    pub fn unique_texts(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        for row in &self.rows {
            if let Some(text) = row[idx].as_text() {
                if !seen.contains(&text) {
                    seen.push(text);
                }
            }
        }
        seen
    }
}

/// Borrowed view of one table row, addressed by column name.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let idx = self.table.column_index(column)?;
        Some(&self.table.rows[self.index][idx])
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Value::as_text)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    /// Numeric value with an absent column or blank cell read as zero.
    pub fn number_or_zero(&self, column: &str) -> f64 {
        self.number(column).unwrap_or(0.0)
    }

    pub fn values(&self) -> &'a [Value] {
        &self.table.rows[self.index]
    }
}

/// The four sheet kinds a monthly export may carry.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Score,
    Sales,
    DepartmentSales,
    Ranking,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Score,
        TableKind::Sales,
        TableKind::DepartmentSales,
        TableKind::Ranking,
    ];

    /// Worksheet name inside the uploaded workbook.
    pub fn sheet_name(self) -> &'static str {
        match self {
            TableKind::Score => "员工积分数据",
            TableKind::Sales => "销售回款数据统计",
            TableKind::DepartmentSales => "部门销售回款统计",
            TableKind::Ranking => "销售回款超期账款排名",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// One optional table per kind; what a single upload produces.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct TableSet {
    pub score: Option<Table>,
    pub sales: Option<Table>,
    pub department_sales: Option<Table>,
    pub ranking: Option<Table>,
}

impl TableSet {
    pub fn get(&self, kind: TableKind) -> Option<&Table> {
        match kind {
            TableKind::Score => self.score.as_ref(),
            TableKind::Sales => self.sales.as_ref(),
            TableKind::DepartmentSales => self.department_sales.as_ref(),
            TableKind::Ranking => self.ranking.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: TableKind) -> &mut Option<Table> {
        match kind {
            TableKind::Score => &mut self.score,
            TableKind::Sales => &mut self.sales,
            TableKind::DepartmentSales => &mut self.department_sales,
            TableKind::Ranking => &mut self.ranking,
        }
    }

    /// Present and non-empty.
    pub fn has(&self, kind: TableKind) -> bool {
        self.get(kind).is_some_and(|t| !t.is_empty())
    }

    pub fn any(&self) -> bool {
        TableKind::ALL.into_iter().any(|k| self.has(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Value::Number(12.0).as_text().as_deref(), Some("12"));
        assert_eq!(Value::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Value::Text("  ".into()).as_text(), None);
    }

    #[test]
    fn unique_texts_keeps_first_appearance_order() {
        let t = Table::new(["队名"])
            .with_row(["B"])
            .with_row(["A"])
            .with_row(["B"]);
        assert_eq!(t.unique_texts("队名"), vec!["B", "A"]);
    }

    #[test]
    fn short_rows_are_padded() {
        let mut t = Table::new(["a", "b"]);
        t.push_row(vec![Value::Number(1.0)]);
        assert_eq!(t.row(0).unwrap().get("b"), Some(&Value::Empty));
    }
}
