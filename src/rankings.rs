use serde::Serialize;
use std::cmp::Ordering;

use crate::records::RankingRecord;
use crate::table::Table;

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct RankingEntry {
    pub name: String,
    pub amount: f64,
}

/// All entries of one `排名类型`, largest amount first.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct RankingCategory {
    pub category: String,
    pub entries: Vec<RankingEntry>,
}

#[derive(Clone, Serialize, Debug, PartialEq, Default)]
pub struct MonthlyRanking {
    pub sales: Option<RankingCategory>,
    pub payment: Option<RankingCategory>,
}

const OVERDUE_KEYWORDS: [&str; 3] = ["逾期", "超期", "未收回"];

/// Distinct categories in sheet order.
fn category_names(records: &[RankingRecord]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for r in records {
        if !names.contains(&r.category.as_str()) {
            names.push(&r.category);
        }
    }
    names
}

fn collect(records: &[RankingRecord], category: &str, keep: impl Fn(f64) -> bool) -> RankingCategory {
    let mut entries: Vec<RankingEntry> = records
        .iter()
        .filter(|r| r.category == category && keep(r.amount))
        .map(|r| RankingEntry {
            name: r.name.clone(),
            amount: r.amount,
        })
        .collect();
    entries.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));
    RankingCategory {
        category: category.to_string(),
        entries,
    }
}

fn matching(table: &Table, needle: &str) -> Vec<RankingCategory> {
    let records = RankingRecord::all(table);
    category_names(&records)
        .into_iter()
        .filter(|c| c.contains(needle))
        .map(|c| collect(&records, c, |a| a >= 0.0))
        .collect()
}

/// One category per week (`第N周销售额`).
pub fn weekly_sales(table: &Table) -> Vec<RankingCategory> {
    matching(table, "周销售额")
}

pub fn weekly_payment(table: &Table) -> Vec<RankingCategory> {
    matching(table, "周回款合计")
}

/// The month's sales and collection rankings. When several categories
/// match, the last one in the sheet wins.
pub fn monthly(table: &Table) -> MonthlyRanking {
    let records = RankingRecord::all(table);
    let mut ranking = MonthlyRanking::default();
    for category in category_names(&records) {
        if category.contains("本月销售额") {
            ranking.sales = Some(collect(&records, category, |a| a >= 0.0));
        } else if category.contains("本月回款合计") {
            ranking.payment = Some(collect(&records, category, |a| a >= 0.0));
        }
    }
    ranking
}

/// Employees with an outstanding overdue balance, from the first overdue
/// category. `None` when the sheet has no such category.
pub fn overdue_warning(table: &Table) -> Option<RankingCategory> {
    let records = RankingRecord::all(table);
    let category = category_names(&records)
        .into_iter()
        .find(|c| OVERDUE_KEYWORDS.iter().any(|k| c.contains(k)))?;
    Some(collect(&records, category, |a| a > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::columns::{AMOUNT, RANKING_NAME, RANKING_TYPE};
    use crate::table::Value;

    fn sheet() -> Table {
        let rows: [(&str, &str, f64); 6] = [
            ("第1周销售额", "甲", 10.0),
            ("第1周销售额", "乙", 30.0),
            ("第1周销售额", "丙", -1.0),
            ("本月销售额", "甲", 100.0),
            ("逾期未收回额", "甲", 0.0),
            ("逾期未收回额", "乙", 5.0),
        ];
        rows.iter().fold(Table::new([RANKING_TYPE, RANKING_NAME, AMOUNT]), |t, (c, n, a)| {
            t.with_row([Value::from(*c), Value::from(*n), Value::from(*a)])
        })
    }

    #[test]
    fn weekly_drops_negative_and_sorts_desc() {
        let weeks = weekly_sales(&sheet());
        assert_eq!(weeks.len(), 1);
        let names: Vec<&str> = weeks[0].entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["乙", "甲"]);
    }

    #[test]
    fn overdue_keeps_positive_balances_only() {
        let warning = overdue_warning(&sheet()).unwrap();
        assert_eq!(warning.entries.len(), 1);
        assert_eq!(warning.entries[0].name, "乙");
    }

    #[test]
    fn monthly_without_payment_category() {
        let m = monthly(&sheet());
        assert!(m.sales.is_some());
        assert!(m.payment.is_none());
    }
}
