use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use crate::error::{LoadError, ValidationError};
use crate::records::ScoreRecord;
use crate::records::columns::*;
use crate::table::{Table, TableKind, TableSet, Value};

/// Uploads above this size are rejected before parsing.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// File-name prefix of the monthly export, used by [`auto_detect`].
pub const EXPORT_FILE_PREFIX: &str = "员工销售回款统计_";

lazy_static! {
    static ref MONTH_LABEL_REGEX: Regex = Regex::new(r"(\d{4})年(\d{1,2})月").unwrap();
}

/// Anything that can list its sheets and hand one back as a [`Table`].
///
/// The loader only talks to this trait, so the sheet-selection rules can be
/// exercised without building an xlsx file.
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;

    fn read_sheet(&mut self, name: &str) -> Result<Table, ValidationError>;
}

/// An xlsx workbook opened through calamine.
pub struct XlsxSource<RS: Read + Seek> {
    workbook: Xlsx<RS>,
}

impl XlsxSource<Cursor<Vec<u8>>> {
    /// Open an uploaded workbook held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        let workbook = Xlsx::new(Cursor::new(bytes)).map_err(|e| LoadError::Workbook(e.to_string()))?;
        Ok(XlsxSource { workbook })
    }
}

impl XlsxSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let workbook: Xlsx<BufReader<File>> = open_workbook(path).map_err(|e: calamine::XlsxError| LoadError::Workbook(e.to_string()))?;
        Ok(XlsxSource { workbook })
    }
}

impl<RS: Read + Seek> SheetSource for XlsxSource<RS> {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_owned()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Table, ValidationError> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| ValidationError::Parse {
                sheet: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(range_to_table(&range))
    }
}

/// First row is the header; blank header cells get pandas-style
/// `Unnamed: i` names and fully blank data rows are dropped.
fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::default();
    };

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_value(cell).as_text() {
            Some(name) => name,
            None => format!("Unnamed: {i}"),
        })
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_empty) {
            continue;
        }
        table.push_row(values);
    }
    table
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}

/// Column a sheet cannot be used without. A sheet missing it is dropped at
/// load time instead of failing the whole file.
pub fn key_column(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Score => TEAM,
        TableKind::Sales => EMPLOYEE,
        TableKind::DepartmentSales => DEPARTMENT,
        TableKind::Ranking => RANKING_TYPE,
    }
}

/// Columns a page needs before it will render a table of this kind.
pub fn required_columns(kind: TableKind) -> &'static [&'static str] {
    match kind {
        TableKind::Score => &[EMPLOYEE, TEAM, PERSONAL_TOTAL, WEIGHTED_TEAM_SCORE],
        TableKind::Sales => &[EMPLOYEE, MONTH_SALES, MONTH_PAYMENT],
        TableKind::DepartmentSales => &[DEPARTMENT, MONTH_SALES],
        TableKind::Ranking => &[RANKING_TYPE, AMOUNT],
    }
}

/// Load every expected sheet that a source carries.
///
/// The file is rejected only when none of the four expected sheet names is
/// present. Each sheet is otherwise loaded on its own: a sheet that fails to
/// parse, or lacks its key column, comes back as `None` while the others
/// still load.
///
/// # Arguments
/// * `source` - The workbook to read from
///
/// # Returns
/// * `Result<TableSet, LoadError>` - The four optional tables, or the reason
///   the whole file was refused
pub fn load_tables<S: SheetSource>(source: &mut S) -> Result<TableSet, LoadError> {
    let available = source.sheet_names();
    let present = |kind: TableKind| available.iter().any(|s| s == kind.sheet_name());

    if !TableKind::ALL.into_iter().any(|k| present(k)) {
        warn!("workbook has none of the expected sheets: {:?}", available);
        return Err(LoadError::NoExpectedSheets);
    }

    let mut tables = TableSet::default();
    for kind in TableKind::ALL {
        if !present(kind) {
            debug!("sheet {} not present, skipping", kind.sheet_name());
            continue;
        }

        let loaded = source.read_sheet(kind.sheet_name()).and_then(|table| {
            if table.has_column(key_column(kind)) {
                Ok(table)
            } else {
                Err(ValidationError::MissingColumns {
                    kind,
                    missing: vec![key_column(kind).to_string()],
                })
            }
        });

        match loaded {
            Ok(table) => {
                info!("loaded sheet {} ({} rows)", kind.sheet_name(), table.len());
                *tables.slot_mut(kind) = Some(table);
            }
            Err(e) => warn!("dropping sheet {}: {}", kind.sheet_name(), e),
        }
    }

    Ok(tables)
}

/// Load an uploaded xlsx workbook from memory.
///
/// # Examples
/// ```no_run
/// use salesboard::loader::load_workbook_bytes;
///
/// let bytes = std::fs::read("员工销售回款统计_2024年5月.xlsx").unwrap();
/// match load_workbook_bytes(bytes) {
///     Ok(tables) => println!("score sheet loaded: {}", tables.score.is_some()),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
pub fn load_workbook_bytes(bytes: Vec<u8>) -> Result<TableSet, LoadError> {
    let mut source = XlsxSource::from_bytes(bytes)?;
    load_tables(&mut source)
}

pub fn load_workbook_path(path: impl AsRef<Path>) -> Result<TableSet, LoadError> {
    let mut source = XlsxSource::open(path)?;
    load_tables(&mut source)
}

/// Check that a table is usable by the pages that read it.
pub fn validate(kind: TableKind, table: Option<&Table>) -> Result<(), ValidationError> {
    let table = match table {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ValidationError::Empty { kind }),
    };

    let missing = table.missing_columns(required_columns(kind));
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns { kind, missing })
    }
}

/// Cheap checks on an upload before its bytes are parsed.
pub fn validate_upload(file_name: &str, size: usize, limit: usize) -> Result<(), LoadError> {
    if file_name.trim().is_empty() {
        return Err(LoadError::NoFile);
    }
    if !file_name.ends_with(".xlsx") {
        return Err(LoadError::NotXlsx);
    }
    if size > limit {
        return Err(LoadError::TooLarge {
            limit_mb: limit / (1024 * 1024),
        });
    }
    Ok(())
}

/// One team's place in the weighted-score standings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRank {
    pub team: String,
    pub weighted_score: Option<f64>,
    pub rank: usize,
}

/// Distinct (team, weighted score) pairs, best first, ranked from 1.
///
/// Rows without a team are ignored. Teams without a weighted score sort last;
/// ties keep sheet order.
pub fn group_ranking(score: &Table) -> Option<Vec<GroupRank>> {
    if score.is_empty() || !score.has_column(TEAM) {
        return None;
    }

    let mut groups: Vec<GroupRank> = Vec::new();
    for row in score.rows() {
        let Some(team) = row.text(TEAM) else { continue };
        let weighted_score = row.number(WEIGHTED_TEAM_SCORE);
        if !groups
            .iter()
            .any(|g| g.team == team && g.weighted_score == weighted_score)
        {
            groups.push(GroupRank {
                team,
                weighted_score,
                rank: 0,
            });
        }
    }

    if groups.is_empty() {
        warn!("score sheet has no rows with a team name");
        return None;
    }

    groups.sort_by(|a, b| descending_nulls_last(a.weighted_score, b.weighted_score));
    for (i, group) in groups.iter_mut().enumerate() {
        group.rank = i + 1;
    }
    Some(groups)
}

fn descending_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn ascending_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => descending_nulls_last(a, b),
    }
}

/// Red list (top two teams) and black list (bottom two teams).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    /// Members of the two best teams, highest personal score first.
    pub red: Vec<ScoreRecord>,
    /// Members of the two worst teams, lowest personal score first.
    pub black: Vec<ScoreRecord>,
    pub groups: Vec<GroupRank>,
}

/// Split the score sheet into red and black lists.
///
/// With fewer than four teams the two lists overlap; with exactly two teams
/// they hold the same members in opposite order. Callers decide how to show
/// that.
pub fn leaderboard(score: &Table) -> Option<Leaderboard> {
    let groups = group_ranking(score)?;

    let red_teams: Vec<&str> = groups.iter().take(2).map(|g| g.team.as_str()).collect();
    let black_teams: Vec<&str> = groups.iter().rev().take(2).map(|g| g.team.as_str()).collect();

    let members = ScoreRecord::all(score);

    let mut red: Vec<ScoreRecord> = members
        .iter()
        .filter(|r| in_teams(&red_teams, r))
        .cloned()
        .collect();
    red.sort_by(|a, b| descending_nulls_last(a.personal_total, b.personal_total));

    let mut black: Vec<ScoreRecord> = members
        .iter()
        .filter(|r| in_teams(&black_teams, r))
        .cloned()
        .collect();
    black.sort_by(|a, b| ascending_nulls_last(a.personal_total, b.personal_total));

    Some(Leaderboard { red, black, groups })
}

fn in_teams(teams: &[&str], record: &ScoreRecord) -> bool {
    record.team.as_deref().is_some_and(|t| teams.contains(&t))
}

/// First `统计月份` value of a table, when the column exists and is filled.
pub fn stat_month(table: Option<&Table>) -> Option<String> {
    table?.row(0)?.text(STAT_MONTH)
}

/// Month label for a history upload.
///
/// Tries `YYYY年M月` in the file name, then the `统计月份` column of the sales
/// sheet, then that of the score sheet, and finally falls back to the file
/// name itself.
pub fn extract_month_label(file_name: &str, tables: &TableSet) -> String {
    if let Some(cap) = MONTH_LABEL_REGEX.captures(file_name) {
        return format!("{}年{}月", &cap[1], &cap[2]);
    }
    stat_month(tables.sales.as_ref())
        .or_else(|| stat_month(tables.score.as_ref()))
        .unwrap_or_else(|| file_name.to_string())
}

/// Headline figures shown right after an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataInfo {
    pub total_employees: usize,
    pub total_teams: usize,
    pub month_info: String,
    pub has_sales_data: bool,
    pub sales_employees: usize,
}

pub fn data_info(tables: &TableSet) -> DataInfo {
    let mut info = DataInfo {
        total_employees: 0,
        total_teams: 0,
        month_info: "未知".to_string(),
        has_sales_data: false,
        sales_employees: 0,
    };

    if let Some(score) = tables.score.as_ref().filter(|t| !t.is_empty()) {
        info.total_employees = score.unique_texts(EMPLOYEE).len();
        info.total_teams = score.unique_texts(TEAM).len();
        if let Some(month) = stat_month(Some(score)) {
            info.month_info = month;
        }
    }

    if let Some(sales) = tables.sales.as_ref().filter(|t| !t.is_empty()) {
        info.has_sales_data = true;
        info.sales_employees = sales.unique_texts(EMPLOYEE).len();
        if info.month_info == "未知" {
            if let Some(month) = stat_month(Some(sales)) {
                info.month_info = month;
            }
        }
    }

    info
}

/// Newest `员工销售回款统计_*.xlsx` in `dir`, by modification time.
pub fn auto_detect(dir: impl AsRef<Path>) -> std::io::Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(EXPORT_FILE_PREFIX) || !name.ends_with(".xlsx") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
