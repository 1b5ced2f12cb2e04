//! Month-over-month comparison across uploaded history files.
//!
//! Every trend is a long-form table: one row per (month, entity) with three
//! amounts in 万元 and a growth-rate string per amount.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::TrendError;
use crate::records::columns::*;
use crate::state::HistoryEntry;
use crate::table::{Row, Table};

/// Raw amounts are in 元; trends show 万元.
pub const DISPLAY_SCALE: f64 = 10_000.0;

/// Comparison pages need at least this many months.
pub const MIN_MONTHS: usize = 2;

lazy_static! {
    static ref YEAR_REGEX: Regex = Regex::new(r"(\d{4})年").unwrap();
    static ref MONTH_REGEX: Regex = Regex::new(r"年(\d{1,2})月").unwrap();
}

/// `YYYYMM` sort key of a month label. Missing parts read as `0000` / `00`,
/// so labels without a date sort first.
pub fn month_sort_key(label: &str) -> String {
    let year = YEAR_REGEX
        .captures(label)
        .map_or_else(|| "0000".to_string(), |c| c[1].to_string());
    let month = MONTH_REGEX
        .captures(label)
        .map_or_else(|| "00".to_string(), |c| format!("{:0>2}", &c[1]));
    format!("{year}{month}")
}

/// History entries in month order. Stable, so labels with equal keys keep
/// their upload order.
pub fn sorted_months(history: &[HistoryEntry]) -> Vec<&HistoryEntry> {
    let mut months: Vec<&HistoryEntry> = history.iter().collect();
    months.sort_by_key(|e| month_sort_key(&e.month));
    months
}

pub fn ensure_comparable(history: &[HistoryEntry]) -> Result<(), TrendError> {
    if history.len() < MIN_MONTHS {
        Err(TrendError::NotEnoughMonths)
    } else {
        Ok(())
    }
}

/// Period-over-period growth, formatted `-50.0%`.
///
/// The first period has nothing to compare against and a previous value of
/// zero has no defined rate; both come out blank.
pub fn growth_rates(values: &[f64]) -> Vec<String> {
    let mut rates = Vec::with_capacity(values.len());
    for (i, current) in values.iter().enumerate() {
        let rate = match i.checked_sub(1).map(|p| values[p]) {
            Some(prev) if prev != 0.0 => (current - prev) / prev * 100.0,
            _ => f64::NAN,
        };
        rates.push(if rate.is_finite() {
            format!("{rate:.1}%")
        } else {
            String::new()
        });
    }
    rates
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Sales,
    Payment,
    Overdue,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Sales, Metric::Payment, Metric::Overdue];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendKind {
    Overall,
    Employee,
    Department,
}

impl TrendKind {
    pub fn entity_column(self) -> Option<&'static str> {
        match self {
            TrendKind::Overall => None,
            TrendKind::Employee => Some("员工"),
            TrendKind::Department => Some("部门"),
        }
    }

    pub fn metric_column(self, metric: Metric) -> &'static str {
        match (self, metric) {
            (TrendKind::Overall, Metric::Sales) => "总销售额(万元)",
            (TrendKind::Overall, Metric::Payment) => "总回款额(万元)",
            (TrendKind::Overall, Metric::Overdue) => "总逾期未收回额(万元)",
            (_, Metric::Sales) => "销售额(万元)",
            (_, Metric::Payment) => "回款额(万元)",
            (_, Metric::Overdue) => "逾期未收回额(万元)",
        }
    }

    pub fn growth_column(self, metric: Metric) -> String {
        format!("{}环比增长率", self.metric_column(metric))
    }

    /// Noun used in user messages ("员工", "部门", "月份").
    fn noun(self) -> &'static str {
        self.entity_column().unwrap_or("月份")
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TrendRow {
    pub month: String,
    pub entity: Option<String>,
    pub values: [f64; 3],
    pub growth: [String; 3],
}

impl TrendRow {
    pub fn value(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }

    pub fn growth(&self, metric: Metric) -> &str {
        &self.growth[metric.index()]
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TrendTable {
    pub kind: TrendKind,
    pub rows: Vec<TrendRow>,
}

impl TrendTable {
    /// `月份`, the entity column if any, the three amounts, then the three
    /// growth columns.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["月份".to_string()];
        headers.extend(self.kind.entity_column().map(str::to_string));
        headers.extend(Metric::ALL.iter().map(|m| self.kind.metric_column(*m).to_string()));
        headers.extend(Metric::ALL.iter().map(|m| self.kind.growth_column(*m)));
        headers
    }

    /// Rows as display strings, aligned with [`TrendTable::headers`].
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = vec![row.month.clone()];
                if self.kind.entity_column().is_some() {
                    record.push(row.entity.clone().unwrap_or_default());
                }
                record.extend(row.values.iter().map(|v| format_amount(*v)));
                record.extend(row.growth.iter().cloned());
                record
            })
            .collect()
    }

    pub fn entities(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(entity) = &row.entity {
                if !seen.contains(entity) {
                    seen.push(entity.clone());
                }
            }
        }
        seen
    }

    fn from_points(kind: TrendKind, mut points: Vec<(String, Option<String>, [f64; 3])>) -> Self {
        // Points arrive in month order; a stable sort by name groups entities
        // and keeps months ordered inside each.
        points.sort_by(|a, b| a.1.cmp(&b.1));

        let mut rows = Vec::with_capacity(points.len());
        let mut start = 0;
        while start < points.len() {
            let entity = &points[start].1;
            let end = start
                + points[start..]
                    .iter()
                    .take_while(|p| &p.1 == entity)
                    .count();
            let group = &points[start..end];

            let growth: Vec<Vec<String>> = Metric::ALL
                .iter()
                .map(|m| {
                    let series: Vec<f64> = group.iter().map(|p| p.2[m.index()]).collect();
                    growth_rates(&series)
                })
                .collect();

            for (i, (month, entity, values)) in group.iter().enumerate() {
                rows.push(TrendRow {
                    month: month.clone(),
                    entity: entity.clone(),
                    values: *values,
                    growth: [
                        growth[0][i].clone(),
                        growth[1][i].clone(),
                        growth[2][i].clone(),
                    ],
                });
            }
            start = end;
        }

        TrendTable { kind, rows }
    }
}

/// Whole amounts keep one decimal place (`1.0`), others print in full.
fn format_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn scaled(row: &Row<'_>, column: &str) -> f64 {
    row.number_or_zero(column) / DISPLAY_SCALE
}

fn employee_amounts(row: &Row<'_>) -> [f64; 3] {
    [
        scaled(row, MONTH_SALES),
        scaled(row, MONTH_PAYMENT),
        scaled(row, OVERDUE_BALANCE),
    ]
}

fn department_amounts(row: &Row<'_>) -> [f64; 3] {
    let payment = if row.get(MONTH_PAYMENT_ON_TIME).is_some() && row.get(MONTH_PAYMENT_OVERDUE).is_some() {
        scaled(row, MONTH_PAYMENT_ON_TIME) + scaled(row, MONTH_PAYMENT_OVERDUE)
    } else {
        0.0
    };
    [scaled(row, MONTH_SALES), payment, scaled(row, OVERDUE_BALANCE)]
}

fn entity_trend(
    history: &[HistoryEntry],
    selected: &[String],
    kind: TrendKind,
    table_of: impl Fn(&HistoryEntry) -> Option<&Table>,
    name_column: &str,
    amounts: impl Fn(&Row<'_>) -> [f64; 3],
) -> Result<TrendTable, TrendError> {
    if selected.is_empty() {
        return Err(TrendError::NoSelection(kind.noun()));
    }

    let mut points = Vec::new();
    for entry in sorted_months(history) {
        let Some(table) = table_of(entry) else { continue };
        for name in selected {
            if let Some(row) = table.find_row(name_column, name) {
                points.push((entry.month.clone(), Some(name.clone()), amounts(&row)));
            }
        }
    }

    if points.is_empty() {
        return Err(TrendError::NoData(kind.noun()));
    }
    Ok(TrendTable::from_points(kind, points))
}

/// Per-employee trend from each month's sales sheet.
///
/// # Arguments
/// * `history` - Uploaded months, in any order
/// * `selected` - Employee names to compare
///
/// # Returns
/// Rows grouped by employee name, months in calendar order; an error when
/// nothing is selected or none of the names appear in any month
///
/// # Examples
/// ```
/// use salesboard::trends::employee_trend;
/// use salesboard::TrendError;
///
/// assert_eq!(employee_trend(&[], &[]), Err(TrendError::NoSelection("员工")));
/// ```
pub fn employee_trend(history: &[HistoryEntry], selected: &[String]) -> Result<TrendTable, TrendError> {
    entity_trend(
        history,
        selected,
        TrendKind::Employee,
        |e| e.sales.as_ref(),
        EMPLOYEE,
        employee_amounts,
    )
}

/// Per-department trend. Collections are the on-time plus overdue columns.
pub fn department_trend(history: &[HistoryEntry], selected: &[String]) -> Result<TrendTable, TrendError> {
    entity_trend(
        history,
        selected,
        TrendKind::Department,
        |e| e.department_sales.as_ref(),
        DEPARTMENT,
        department_amounts,
    )
}

/// Whole-company trend read from each month's `合计` row.
pub fn overall_trend(history: &[HistoryEntry]) -> TrendTable {
    let points = sorted_months(history)
        .into_iter()
        .map(|entry| {
            let totals = entry
                .sales
                .as_ref()
                .and_then(|t| t.find_row(EMPLOYEE, TOTAL_ROW))
                .map(|row| employee_amounts(&row))
                .unwrap_or([0.0; 3]);
            (entry.month.clone(), None, totals)
        })
        .collect();
    TrendTable::from_points(TrendKind::Overall, points)
}

fn distinct_names(history: &[HistoryEntry], table_of: impl Fn(&HistoryEntry) -> Option<&Table>, column: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for table in history.iter().filter_map(table_of) {
        for name in table.unique_texts(column) {
            if name != TOTAL_ROW && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names.sort_by_key(|n| n.to_lowercase());
    names
}

/// Every employee seen in any month, for the selection list.
pub fn all_employees(history: &[HistoryEntry]) -> Vec<String> {
    distinct_names(history, |e| e.sales.as_ref(), EMPLOYEE)
}

pub fn all_departments(history: &[HistoryEntry]) -> Vec<String> {
    distinct_names(history, |e| e.department_sales.as_ref(), DEPARTMENT)
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct EntityAverage {
    pub entity: String,
    pub sales: f64,
    pub payment: f64,
    pub overdue: f64,
}

/// Mean of each amount per entity; the radar comparison draws these.
pub fn entity_averages(trend: &TrendTable) -> Vec<EntityAverage> {
    trend
        .entities()
        .into_iter()
        .map(|entity| {
            let rows: Vec<&TrendRow> = trend
                .rows
                .iter()
                .filter(|r| r.entity.as_deref() == Some(entity.as_str()))
                .collect();
            let mean = |m: Metric| rows.iter().map(|r| r.value(m)).sum::<f64>() / rows.len() as f64;
            EntityAverage {
                sales: mean(Metric::Sales),
                payment: mean(Metric::Payment),
                overdue: mean(Metric::Overdue),
                entity,
            }
        })
        .collect()
}

/// Entity × month grid of one amount; gaps are zero.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Pivot {
    pub metric: Metric,
    pub months: Vec<String>,
    pub entities: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

pub fn pivot(trend: &TrendTable, metric: Metric) -> Pivot {
    let mut months: Vec<String> = Vec::new();
    for row in &trend.rows {
        if !months.contains(&row.month) {
            months.push(row.month.clone());
        }
    }
    months.sort_by_key(|m| month_sort_key(m));

    let entities = trend.entities();
    let cells = entities
        .iter()
        .map(|entity| {
            months
                .iter()
                .map(|month| {
                    trend
                        .rows
                        .iter()
                        .find(|r| &r.month == month && r.entity.as_ref() == Some(entity))
                        .map_or(0.0, |r| r.value(metric))
                })
                .collect()
        })
        .collect();

    Pivot {
        metric,
        months,
        entities,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_pads_month() {
        assert_eq!(month_sort_key("2024年5月"), "202405");
        assert_eq!(month_sort_key("2023年12月"), "202312");
        assert_eq!(month_sort_key("月报.xlsx"), "000000");
    }

    #[test]
    fn growth_from_zero_is_blank() {
        assert_eq!(growth_rates(&[0.0, 100.0, 50.0]), vec!["", "", "-50.0%"]);
    }

    #[test]
    fn amounts_keep_a_decimal_place() {
        assert_eq!(format_amount(1.0), "1.0");
        assert_eq!(format_amount(0.0), "0.0");
        assert_eq!(format_amount(2.5), "2.5");
        assert_eq!(format_amount(0.123), "0.123");
    }

    #[test]
    fn growth_rounds_to_one_decimal() {
        assert_eq!(growth_rates(&[3.0, 4.0]), vec!["", "33.3%"]);
    }
}
