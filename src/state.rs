use log::debug;
use serde::Serialize;

use crate::records::columns::{DEPARTMENT, EMPLOYEE, TEAM};
use crate::table::{Table, TableKind, TableSet};

/// One uploaded month kept for historical comparison.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct HistoryEntry {
    pub month: String,
    pub file_name: String,
    pub sales: Option<Table>,
    pub department_sales: Option<Table>,
}

/// The four current tables plus the file they came from. Captured before an
/// upload so that the upload can be undone.
#[derive(Clone, Serialize, Debug, PartialEq, Default)]
pub struct Snapshot {
    pub tables: TableSet,
    pub file_name: Option<String>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Summary {
    pub data_loaded: bool,
    pub file_name: Option<String>,
    pub employee_count: usize,
    pub team_count: usize,
    pub department_count: usize,
    pub history_file_count: usize,
}

/// Everything one browser session has loaded.
///
/// Plain in-memory state: it lives as long as its session and performs no I/O.
#[derive(Clone, Debug, Default)]
pub struct StateStore {
    tables: TableSet,
    file_name: Option<String>,
    data_loaded: bool,
    // Insertion-ordered; month labels are unique.
    history: Vec<HistoryEntry>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&mut self, kind: TableKind, data: Option<Table>) {
        *self.tables.slot_mut(kind) = data;
        self.data_loaded = self.tables.any();
    }

    /// Replace all four tables at once, as a successful upload does.
    pub fn set_tables(&mut self, tables: TableSet) {
        for kind in TableKind::ALL {
            self.set_table(kind, tables.get(kind).cloned());
        }
    }

    pub fn table(&self, kind: TableKind) -> Option<&Table> {
        self.tables.get(kind)
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Present and non-empty.
    pub fn has_table(&self, kind: TableKind) -> bool {
        self.tables.has(kind)
    }

    pub fn clear_all(&mut self) {
        self.tables = TableSet::default();
        self.file_name = None;
        self.data_loaded = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.data_loaded
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, file_name: Option<String>) {
        self.file_name = file_name;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tables: self.tables.clone(),
            file_name: self.file_name.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.set_tables(snapshot.tables);
        self.file_name = snapshot.file_name;
    }

    pub fn can_access_score_center(&self) -> bool {
        self.has_table(TableKind::Score)
    }

    pub fn can_access_sales_center(&self) -> bool {
        self.has_table(TableKind::Sales)
            || self.has_table(TableKind::DepartmentSales)
            || self.has_table(TableKind::Ranking)
    }

    /// Sales-center features with data behind them, in menu order.
    pub fn available_sales_functions(&self) -> Vec<TableKind> {
        [TableKind::Ranking, TableKind::Sales, TableKind::DepartmentSales]
            .into_iter()
            .filter(|k| self.has_table(*k))
            .collect()
    }

    /// Store a month. A month already present is overwritten in place.
    pub fn add_history(&mut self, month: &str, entry: HistoryEntry) {
        match self.history.iter_mut().find(|e| e.month == month) {
            Some(existing) => {
                debug!("replacing history month {month}");
                *existing = HistoryEntry {
                    month: month.to_string(),
                    ..entry
                };
            }
            None => self.history.push(HistoryEntry {
                month: month.to_string(),
                ..entry
            }),
        }
    }

    pub fn remove_history(&mut self, month: &str) -> Option<HistoryEntry> {
        let idx = self.history.iter().position(|e| e.month == month)?;
        Some(self.history.remove(idx))
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn history_entry(&self, month: &str) -> Option<&HistoryEntry> {
        self.history.iter().find(|e| e.month == month)
    }

    pub fn has_history_file(&self, file_name: &str) -> bool {
        self.history.iter().any(|e| e.file_name == file_name)
    }

    /// Counts shown on the home page.
    ///
    /// # Returns
    /// Load flag, file name, distinct employees and teams from the score
    /// sheet, departments other than `合计`, and the number of history months
    ///
    /// # Examples
    /// ```
    /// use salesboard::StateStore;
    ///
    /// let summary = StateStore::new().summary();
    /// assert!(!summary.data_loaded);
    /// assert_eq!(summary.history_file_count, 0);
    /// ```
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            data_loaded: self.data_loaded,
            file_name: self.file_name.clone(),
            employee_count: 0,
            team_count: 0,
            department_count: 0,
            history_file_count: self.history.len(),
        };

        if let Some(score) = self.table(TableKind::Score).filter(|t| !t.is_empty()) {
            summary.employee_count = score.unique_texts(EMPLOYEE).len();
            summary.team_count = score.unique_texts(TEAM).len();
        }

        if let Some(dept) = self
            .table(TableKind::DepartmentSales)
            .filter(|t| !t.is_empty() && t.has_column(DEPARTMENT))
        {
            // The aggregate row is one of the distinct values.
            summary.department_count = dept.unique_texts(DEPARTMENT).len().saturating_sub(1);
        }

        summary
    }
}
