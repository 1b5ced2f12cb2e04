mod common;

use calamine::{Data, Reader, Xlsx};
use common::*;
use salesboard::downloader::{self, ExportFormat};
use salesboard::state::HistoryEntry;
use salesboard::trends::{self, TrendKind};
use std::io::Cursor;

// Helper function for two months of history
fn history() -> Vec<HistoryEntry> {
    ["2024年1月", "2024年2月"]
        .iter()
        .enumerate()
        .map(|(i, month)| HistoryEntry {
            month: month.to_string(),
            file_name: format!("{month}.xlsx"),
            sales: Some(sales_table(&[("张,三", 10000.0 * (i + 1) as f64, 0.0, 0.0)])),
            department_sales: None,
        })
        .collect()
}

#[test]
fn test_csv_has_header_and_quotes() {
    let trend = trends::employee_trend(&history(), &["张,三".to_string()]).unwrap();
    let csv = downloader::to_csv(&trend).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("月份,员工,销售额(万元)"));
    assert_eq!(lines[1], "2024年1月,\"张,三\",1.0,0.0,0.0,,,");
    assert!(lines[2].ends_with("100.0%,,"));
}

#[test]
fn test_xlsx_reads_back() {
    let trend = trends::overall_trend(&history());
    let bytes = downloader::export(&trend, ExportFormat::Xlsx).unwrap();

    let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("总体趋势").unwrap();
    assert_eq!(range.get((0, 0)), Some(&Data::String("月份".to_string())));
    assert_eq!(range.get((2, 1)), Some(&Data::Float(2.0)));
    assert_eq!(range.height(), 3);
}

#[test]
fn test_export_names() {
    assert_eq!(ExportFormat::from_name("CSV"), Some(ExportFormat::Csv));
    assert_eq!(ExportFormat::from_name("pdf"), None);

    let name = downloader::export_file_name(TrendKind::Department, ExportFormat::Xlsx);
    assert!(name.starts_with("部门趋势数据_"));
    assert!(name.ends_with(".xlsx"));
}
