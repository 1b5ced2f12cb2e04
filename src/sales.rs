use serde::Serialize;
use std::cmp::Ordering;

use crate::records::columns::{week_payment, week_sales};
use crate::records::{SalesRecord, week_numbers};
use crate::table::Table;
use crate::trends::DISPLAY_SCALE;

/// Headline figures of the sales sheet, amounts in 万元.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SalesOverview {
    pub employee_count: usize,
    pub total_sales: f64,
    pub total_payment: f64,
    pub avg_sales: f64,
    pub avg_payment: f64,
    /// Mean completion ratio in percent, when the sheet carries one.
    pub avg_sales_progress: Option<f64>,
    pub avg_payment_progress: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Totals and averages over employee rows; the `合计` row is left out.
pub fn overview(table: &Table) -> SalesOverview {
    let employees = SalesRecord::employees(table);
    let total_sales: f64 = employees.iter().map(|r| r.month_sales).sum();
    let total_payment: f64 = employees.iter().map(|r| r.month_payment).sum();

    SalesOverview {
        employee_count: employees.len(),
        total_sales: total_sales / DISPLAY_SCALE,
        total_payment: total_payment / DISPLAY_SCALE,
        avg_sales: mean(employees.iter().map(|r| r.month_sales)).unwrap_or(0.0) / DISPLAY_SCALE,
        avg_payment: mean(employees.iter().map(|r| r.month_payment)).unwrap_or(0.0) / DISPLAY_SCALE,
        avg_sales_progress: mean(employees.iter().filter_map(|r| r.sales_progress)).map(|p| p * 100.0),
        avg_payment_progress: mean(employees.iter().filter_map(|r| r.payment_progress)).map(|p| p * 100.0),
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct WeekTotal {
    pub label: String,
    pub sales: f64,
    pub payment: f64,
}

/// Company-wide weekly amounts, for weeks with both a sales and a
/// collections column.
pub fn weekly_totals(table: &Table) -> Vec<WeekTotal> {
    let employees = SalesRecord::employees(table);
    week_numbers(table)
        .into_iter()
        .filter(|w| table.has_column(&week_sales(*w)) && table.has_column(&week_payment(*w)))
        .map(|week| {
            let amounts = employees
                .iter()
                .flat_map(|r| r.weekly.iter().filter(|a| a.week == week));
            let (sales, payment) = amounts.fold((0.0, 0.0), |(s, p), a| (s + a.sales, p + a.payment.unwrap_or(0.0)));
            WeekTotal {
                label: format!("第{week}周"),
                sales: sales / DISPLAY_SCALE,
                payment: payment / DISPLAY_SCALE,
            }
        })
        .collect()
}

/// Employees grouped by task completion: at least 100%, 66% to 99%, below 66%.
#[derive(Clone, Serialize, Debug, PartialEq, Default)]
pub struct CompletionBuckets {
    pub excellent: Vec<String>,
    pub good: Vec<String>,
    pub need_effort: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    Sales,
    Payment,
}

/// `None` when the sheet has no completion column for that task.
pub fn completion_buckets(table: &Table, task: Task) -> Option<CompletionBuckets> {
    let employees = SalesRecord::employees(table);
    let progress_of = |r: &SalesRecord| match task {
        Task::Sales => r.sales_progress,
        Task::Payment => r.payment_progress,
    };
    if employees.iter().all(|r| progress_of(r).is_none()) {
        return None;
    }

    let mut buckets = CompletionBuckets::default();
    for record in &employees {
        let Some(progress) = progress_of(record) else { continue };
        let bucket = if progress >= 1.0 {
            &mut buckets.excellent
        } else if progress >= 0.66 {
            &mut buckets.good
        } else {
            &mut buckets.need_effort
        };
        bucket.push(record.name.clone());
    }
    Some(buckets)
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Badge {
    pub name: String,
    /// Raw amount in 元 (progress value for the most-improved badge).
    pub value: f64,
}

#[derive(Clone, Serialize, Debug, PartialEq, Default)]
pub struct Badges {
    pub top_sales: Option<Badge>,
    pub top_payment: Option<Badge>,
    pub most_improved: Option<Badge>,
}

fn top_by(employees: &[SalesRecord], key: impl Fn(&SalesRecord) -> f64) -> Option<Badge> {
    employees
        .iter()
        .max_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal))
        .map(|r| Badge {
            name: r.name.clone(),
            value: key(r),
        })
}

/// Sales champion, collections champion and most improved employee.
///
/// Improvement is `Δsales × 0.6 + Δcollections × 0.4` against the last-month
/// reference columns; employees without both references are skipped.
pub fn badges(table: &Table) -> Badges {
    let employees = SalesRecord::employees(table);
    let improved: Vec<SalesRecord> = employees
        .iter()
        .filter(|r| r.last_month_sales.is_some() && r.last_month_payment.is_some())
        .cloned()
        .collect();

    Badges {
        top_sales: top_by(&employees, |r| r.month_sales),
        top_payment: top_by(&employees, |r| r.month_payment),
        most_improved: top_by(&improved, |r| {
            let sales_diff = r.month_sales - r.last_month_sales.unwrap_or(0.0);
            let payment_diff = r.month_payment - r.last_month_payment.unwrap_or(0.0);
            sales_diff * 0.6 + payment_diff * 0.4
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::columns::*;
    use crate::table::Value;

    fn sheet() -> Table {
        Table::new([EMPLOYEE, MONTH_SALES, MONTH_PAYMENT, SALES_PROGRESS, "第1周销售额", "第1周回款合计"])
            .with_row([
                Value::from("甲"),
                Value::from(20000.0),
                Value::from(10000.0),
                Value::from(1.2),
                Value::from(5000.0),
                Value::from(1000.0),
            ])
            .with_row([
                Value::from("乙"),
                Value::from(40000.0),
                Value::from(30000.0),
                Value::from(0.5),
                Value::from(15000.0),
                Value::from(3000.0),
            ])
            .with_row([
                Value::from(TOTAL_ROW),
                Value::from(60000.0),
                Value::from(40000.0),
                Value::Empty,
                Value::from(20000.0),
                Value::from(4000.0),
            ])
    }

    #[test]
    fn overview_skips_total_row() {
        let o = overview(&sheet());
        assert_eq!(o.employee_count, 2);
        assert_eq!(o.total_sales, 6.0);
        assert_eq!(o.avg_payment, 2.0);
        assert!((o.avg_sales_progress.unwrap() - 85.0).abs() < 1e-9);
        assert_eq!(o.avg_payment_progress, None);
    }

    #[test]
    fn weekly_totals_in_wan() {
        let weeks = weekly_totals(&sheet());
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].label, "第1周");
        assert_eq!(weeks[0].sales, 2.0);
        assert_eq!(weeks[0].payment, 0.4);
    }

    #[test]
    fn completion_buckets_split_on_thresholds() {
        let b = completion_buckets(&sheet(), Task::Sales).unwrap();
        assert_eq!(b.excellent, vec!["甲"]);
        assert_eq!(b.need_effort, vec!["乙"]);
        assert!(completion_buckets(&sheet(), Task::Payment).is_none());
    }

    #[test]
    fn champions_and_no_improvement_reference() {
        let b = badges(&sheet());
        assert_eq!(b.top_sales.unwrap().name, "乙");
        assert!(b.most_improved.is_none());
    }

    #[test]
    fn most_improved_weighs_sales_over_collections() {
        let [last_sales, last_payment] = [LAST_MONTH_SALES[0], LAST_MONTH_PAYMENT[0]];
        let row = |name: &str, sales: f64, payment: f64, prev_sales: f64, prev_payment: Option<f64>| {
            vec![
                Value::from(name),
                Value::from(sales),
                Value::from(payment),
                Value::from(prev_sales),
                prev_payment.map_or(Value::Empty, Value::from),
            ]
        };
        let mut table = Table::new([EMPLOYEE, MONTH_SALES, MONTH_PAYMENT, last_sales, last_payment]);
        // 20000 × 0.6 + 0 × 0.4 = 12000
        table.push_row(row("甲", 30000.0, 10000.0, 10000.0, Some(10000.0)));
        // 5000 × 0.6 + 30000 × 0.4 = 15000
        table.push_row(row("乙", 50000.0, 50000.0, 45000.0, Some(20000.0)));
        // No collections reference, so not ranked.
        table.push_row(row("丙", 90000.0, 0.0, 0.0, None));

        let improved = badges(&table).most_improved.unwrap();
        assert_eq!(improved.name, "乙");
        assert!((improved.value - 15000.0).abs() < 1e-6);
    }
}
