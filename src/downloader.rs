use chrono::Local;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::ExportError;
use crate::trends::{TrendKind, TrendTable};

/// Export format requested by the download buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Convert a trend table to CSV
///
/// UTF-8, comma-separated, with a header row. Quoting of commas, quotes and
/// newlines is left to the `csv` writer.
///
/// # Examples
/// ```
/// use salesboard::downloader::to_csv;
/// use salesboard::trends::overall_trend;
///
/// let csv = to_csv(&overall_trend(&[])).unwrap();
/// assert!(csv.starts_with("月份,"));
/// ```
pub fn to_csv(trend: &TrendTable) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(trend.headers())?;
    for record in trend.records() {
        writer.write_record(&record)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Convert a trend table to an XLSX workbook held in memory
///
/// Amounts are written as numbers so the sheet can be charted; month,
/// entity and growth columns are written as text.
pub fn to_xlsx(trend: &TrendTable) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(trend.kind))?;

    for (c, header) in trend.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, header, &bold)?;
    }

    for (r, row) in trend.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        let mut c: u16 = 0;
        worksheet.write_string(r, c, &row.month)?;
        c += 1;
        if trend.kind.entity_column().is_some() {
            worksheet.write_string(r, c, row.entity.as_deref().unwrap_or_default())?;
            c += 1;
        }
        for value in row.values {
            worksheet.write_number(r, c, value)?;
            c += 1;
        }
        for growth in &row.growth {
            worksheet.write_string(r, c, growth)?;
            c += 1;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn sheet_name(kind: TrendKind) -> &'static str {
    match kind {
        TrendKind::Overall => "总体趋势",
        TrendKind::Employee => "员工趋势",
        TrendKind::Department => "部门趋势",
    }
}

/// Download file name, e.g. `员工趋势数据_20240105.csv`.
pub fn export_file_name(kind: TrendKind, format: ExportFormat) -> String {
    let prefix = match kind {
        TrendKind::Overall => "总体趋势数据",
        TrendKind::Employee => "员工趋势数据",
        TrendKind::Department => "部门趋势数据",
    };
    format!("{}_{}.{}", prefix, Local::now().format("%Y%m%d"), format.extension())
}

/// Render `trend` in the requested format.
pub fn export(trend: &TrendTable, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => Ok(to_csv(trend)?.into_bytes()),
        ExportFormat::Xlsx => to_xlsx(trend),
    }
}
