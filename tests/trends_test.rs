mod common;

use common::*;
use salesboard::state::HistoryEntry;
use salesboard::trends::{self, Metric, TrendKind};
use salesboard::TrendError;

// Helper function for one month of history: 张三's sales, plus department 一部
fn month(label: &str, sales: f64) -> HistoryEntry {
    HistoryEntry {
        month: label.to_string(),
        file_name: format!("{label}.xlsx"),
        sales: Some(sales_table(&[("张三", sales, sales / 2.0, 0.0), ("李四", 10000.0, 0.0, 0.0)])),
        department_sales: Some(department_table(&[("一部", sales, 20000.0, 10000.0, 0.0)])),
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_growth_law_across_months() {
    // Uploaded out of order; the trend follows the calendar.
    let history = vec![
        month("2024年3月", 500_000.0),
        month("2024年1月", 0.0),
        month("2024年2月", 1_000_000.0),
    ];

    let trend = trends::employee_trend(&history, &names(&["张三"])).unwrap();
    let months: Vec<&str> = trend.rows.iter().map(|r| r.month.as_str()).collect();
    assert_eq!(months, vec!["2024年1月", "2024年2月", "2024年3月"]);

    let sales: Vec<f64> = trend.rows.iter().map(|r| r.value(Metric::Sales)).collect();
    assert_eq!(sales, vec![0.0, 100.0, 50.0]);
    let growth: Vec<&str> = trend.rows.iter().map(|r| r.growth(Metric::Sales)).collect();
    assert_eq!(growth, vec!["", "", "-50.0%"]);
}

#[test]
fn test_unlabelled_months_sort_first_in_upload_order() {
    let history = vec![month("2024年1月", 1.0), month("b.xlsx", 1.0), month("a.xlsx", 1.0)];
    let sorted: Vec<&str> = trends::sorted_months(&history).iter().map(|e| e.month.as_str()).collect();
    assert_eq!(sorted, vec!["b.xlsx", "a.xlsx", "2024年1月"]);
}

#[test]
fn test_entities_grouped_by_name() {
    let history = vec![month("2024年2月", 20000.0), month("2024年1月", 10000.0)];
    let trend = trends::employee_trend(&history, &names(&["李四", "张三"])).unwrap();

    // 张 (U+5F20) sorts before 李 (U+674E), whatever the selection order.
    let entities: Vec<&str> = trend.rows.iter().filter_map(|r| r.entity.as_deref()).collect();
    assert_eq!(entities, vec!["张三", "张三", "李四", "李四"]);

    let zhang: Vec<&str> = trend
        .rows
        .iter()
        .filter(|r| r.entity.as_deref() == Some("张三"))
        .map(|r| r.month.as_str())
        .collect();
    assert_eq!(zhang, vec!["2024年1月", "2024年2月"]);
    let second = trend.rows.iter().filter(|r| r.entity.as_deref() == Some("张三")).nth(1).unwrap();
    assert_eq!(second.growth(Metric::Sales), "100.0%");
}

#[test]
fn test_pivot_and_averages_fill_gaps() {
    // 张三 only joins in February.
    let history = vec![
        HistoryEntry {
            month: "2024年1月".to_string(),
            file_name: "jan.xlsx".to_string(),
            sales: Some(sales_table(&[("李四", 10000.0, 5000.0, 0.0)])),
            department_sales: None,
        },
        HistoryEntry {
            month: "2024年2月".to_string(),
            file_name: "feb.xlsx".to_string(),
            sales: Some(sales_table(&[("张三", 30000.0, 15000.0, 0.0), ("李四", 20000.0, 10000.0, 0.0)])),
            department_sales: None,
        },
    ];
    let trend = trends::employee_trend(&history, &names(&["张三", "李四"])).unwrap();

    let pivot = trends::pivot(&trend, Metric::Sales);
    assert_eq!(pivot.months, names(&["2024年1月", "2024年2月"]));
    assert_eq!(pivot.entities, names(&["张三", "李四"]));
    assert_eq!(pivot.cells, vec![vec![0.0, 3.0], vec![1.0, 2.0]]);

    let averages = trends::entity_averages(&trend);
    assert_eq!(averages.len(), 2);
    assert_eq!(averages[0].entity, "张三");
    assert_eq!(averages[0].sales, 3.0);
    assert_eq!(averages[1].entity, "李四");
    assert_eq!(averages[1].sales, 1.5);
    assert_eq!(averages[1].payment, 0.75);
    assert_eq!(averages[1].overdue, 0.0);
}

#[test]
fn test_department_payment_sums_collections() {
    let history = vec![month("2024年1月", 10000.0), month("2024年2月", 20000.0)];
    let trend = trends::department_trend(&history, &names(&["一部"])).unwrap();

    assert_eq!(trend.kind, TrendKind::Department);
    assert_eq!(trend.rows[0].value(Metric::Payment), 3.0);
    assert_eq!(trend.headers()[1], "部门");
    assert_eq!(trend.headers()[6], "回款额(万元)环比增长率");
}

#[test]
fn test_selection_errors() {
    let history = vec![month("2024年1月", 1.0), month("2024年2月", 1.0)];
    assert_eq!(
        trends::employee_trend(&history, &[]),
        Err(TrendError::NoSelection("员工"))
    );
    assert_eq!(
        trends::department_trend(&history, &names(&["不存在"])),
        Err(TrendError::NoData("部门"))
    );
}

#[test]
fn test_overall_trend_reads_total_row() {
    let history = vec![month("2024年2月", 20000.0), month("2024年1月", 10000.0)];
    let trend = trends::overall_trend(&history);

    assert_eq!(trend.rows.len(), 2);
    assert_eq!(trend.rows[0].month, "2024年1月");
    // 合计 = 张三 + 李四
    assert_eq!(trend.rows[0].value(Metric::Sales), 2.0);
    assert_eq!(trend.rows[1].value(Metric::Sales), 3.0);
    assert_eq!(trend.rows[1].growth(Metric::Sales), "50.0%");
    assert!(trend.headers().iter().all(|h| h != "员工"));
}

#[test]
fn test_comparison_needs_two_months() {
    let history = vec![month("2024年1月", 1.0)];
    assert_eq!(trends::ensure_comparable(&history), Err(TrendError::NotEnoughMonths));
    // 合计 is not an employee.
    assert_eq!(trends::all_employees(&history), names(&["张三", "李四"]));
}
