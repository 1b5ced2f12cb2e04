//! Typed views over the four sheet kinds.
//!
//! Sheets arrive with free-form headers, so the loader keeps them as
//! [`Table`]s. The records here pull out the fields the dashboard actually
//! reads; anything extra stays available on the table itself.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::table::{Row, Table};

/// Column headers used by the monthly export.
pub mod columns {
    pub const EMPLOYEE: &str = "员工姓名";
    pub const TEAM: &str = "队名";
    pub const PERSONAL_TOTAL: &str = "个人总积分";
    pub const WEIGHTED_TEAM_SCORE: &str = "加权小组总分";
    pub const STAT_MONTH: &str = "统计月份";

    pub const DEPARTMENT: &str = "部门";
    pub const MONTH_SALES: &str = "本月销售额";
    pub const MONTH_PAYMENT: &str = "本月回款合计";
    pub const MONTH_PAYMENT_ON_TIME: &str = "本月回未超期款";
    pub const MONTH_PAYMENT_OVERDUE: &str = "本月回超期款";
    pub const OVERDUE_BALANCE: &str = "月末逾期未收回额";
    pub const SALES_TASK: &str = "本月销售任务";
    pub const PAYMENT_TASK: &str = "本月回款任务";
    pub const SALES_PROGRESS: &str = "销售业绩完成进度";
    pub const PAYMENT_PROGRESS: &str = "回款业绩完成进度";
    pub const LAST_MONTH_SALES: [&str; 2] = ["上月销售额", "上月销售额参考"];
    pub const LAST_MONTH_PAYMENT: [&str; 2] = ["上月回款额", "上月回款额参考"];

    pub const RANKING_TYPE: &str = "排名类型";
    pub const RANKING_NAME: &str = "姓名";
    pub const AMOUNT: &str = "金额";

    /// Name of the aggregate row in sales and department sheets.
    pub const TOTAL_ROW: &str = "合计";

    pub const SCORE_COMPONENTS: [&str; 9] = [
        "销售额目标分",
        "回款额目标分",
        "超期账款追回分",
        "销售排名分",
        "回款排名分",
        "销售进步分",
        "回款进步分",
        "基础分",
        "小组加分",
    ];

    pub fn week_sales(week: u32) -> String {
        format!("第{week}周销售额")
    }

    pub fn week_payment(week: u32) -> String {
        format!("第{week}周回款合计")
    }
}

use columns::*;

lazy_static! {
    static ref WEEK_SALES_REGEX: Regex = Regex::new(r"^第(\d+)周销售额$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub name: String,
    pub team: Option<String>,
    pub personal_total: Option<f64>,
    pub weighted_team_score: Option<f64>,
    /// Component scores present on the row, in the export's canonical order.
    pub components: Vec<(String, f64)>,
}

impl ScoreRecord {
    pub fn from_row(row: &Row<'_>) -> Option<Self> {
        let name = row.text(EMPLOYEE)?;
        let components = SCORE_COMPONENTS
            .iter()
            .filter_map(|c| row.number(c).map(|v| (c.to_string(), v)))
            .collect();
        Some(ScoreRecord {
            name,
            team: row.text(TEAM),
            personal_total: row.number(PERSONAL_TOTAL),
            weighted_team_score: row.number(WEIGHTED_TEAM_SCORE),
            components,
        })
    }

    pub fn all(table: &Table) -> Vec<Self> {
        table.rows().filter_map(|r| Self::from_row(&r)).collect()
    }
}

/// Sales and collection amounts for one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAmounts {
    pub week: u32,
    pub sales: f64,
    pub payment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub name: String,
    pub team: Option<String>,
    pub month_sales: f64,
    pub month_payment: f64,
    pub payment_on_time: f64,
    pub payment_overdue: f64,
    pub overdue_balance: f64,
    pub weekly: Vec<WeeklyAmounts>,
    pub sales_task: Option<f64>,
    pub payment_task: Option<f64>,
    pub sales_progress: Option<f64>,
    pub payment_progress: Option<f64>,
    pub last_month_sales: Option<f64>,
    pub last_month_payment: Option<f64>,
}

impl SalesRecord {
    fn from_row_named(row: &Row<'_>, name_column: &str, weeks: &[u32]) -> Option<Self> {
        let name = row.text(name_column)?;
        let weekly = weeks
            .iter()
            .map(|&week| WeeklyAmounts {
                week,
                sales: row.number_or_zero(&week_sales(week)),
                payment: row.number(&week_payment(week)),
            })
            .collect();
        Some(SalesRecord {
            name,
            team: row.text(TEAM),
            month_sales: row.number_or_zero(MONTH_SALES),
            month_payment: row.number_or_zero(MONTH_PAYMENT),
            payment_on_time: row.number_or_zero(MONTH_PAYMENT_ON_TIME),
            payment_overdue: row.number_or_zero(MONTH_PAYMENT_OVERDUE),
            overdue_balance: row.number_or_zero(OVERDUE_BALANCE),
            weekly,
            sales_task: row.number(SALES_TASK),
            payment_task: row.number(PAYMENT_TASK),
            sales_progress: row.number(SALES_PROGRESS),
            payment_progress: row.number(PAYMENT_PROGRESS),
            last_month_sales: LAST_MONTH_SALES.iter().find_map(|c| row.number(c)),
            last_month_payment: LAST_MONTH_PAYMENT.iter().find_map(|c| row.number(c)),
        })
    }

    pub fn from_row(row: &Row<'_>, weeks: &[u32]) -> Option<Self> {
        Self::from_row_named(row, EMPLOYEE, weeks)
    }

    pub fn is_total(&self) -> bool {
        self.name == TOTAL_ROW
    }

    /// Employee rows, without the aggregate row.
    pub fn employees(table: &Table) -> Vec<Self> {
        let weeks = week_numbers(table);
        table
            .rows()
            .filter_map(|r| Self::from_row(&r, &weeks))
            .filter(|r| !r.is_total())
            .collect()
    }

    pub fn total(table: &Table) -> Option<Self> {
        let weeks = week_numbers(table);
        table
            .find_row(EMPLOYEE, TOTAL_ROW)
            .and_then(|r| Self::from_row(&r, &weeks))
    }
}

/// Department rows carry the same amounts as employee rows, keyed by `部门`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentSalesRecord {
    pub department: String,
    #[serde(flatten)]
    pub amounts: SalesRecord,
}

impl DepartmentSalesRecord {
    pub fn departments(table: &Table) -> Vec<Self> {
        let weeks = week_numbers(table);
        table
            .rows()
            .filter_map(|r| SalesRecord::from_row_named(&r, DEPARTMENT, &weeks))
            .filter(|r| !r.is_total())
            .map(|amounts| DepartmentSalesRecord {
                department: amounts.name.clone(),
                amounts,
            })
            .collect()
    }

    /// The company-wide `合计` row.
    pub fn total(table: &Table) -> Option<SalesRecord> {
        let weeks = week_numbers(table);
        table
            .find_row(DEPARTMENT, TOTAL_ROW)
            .and_then(|r| SalesRecord::from_row_named(&r, DEPARTMENT, &weeks))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRecord {
    pub category: String,
    pub name: String,
    pub amount: f64,
}

impl RankingRecord {
    /// Rows missing a category, a name or an amount are skipped.
    pub fn all(table: &Table) -> Vec<Self> {
        let name_column = if table.has_column(RANKING_NAME) {
            RANKING_NAME
        } else {
            EMPLOYEE
        };
        table
            .rows()
            .filter_map(|r| {
                Some(RankingRecord {
                    category: r.text(RANKING_TYPE)?,
                    name: r.text(name_column)?,
                    amount: r.number(AMOUNT)?,
                })
            })
            .collect()
    }
}

/// Week numbers with a `第N周销售额` column, ascending and deduplicated.
pub fn week_numbers(table: &Table) -> Vec<u32> {
    let mut weeks: Vec<u32> = table
        .columns()
        .iter()
        .filter_map(|c| WEEK_SALES_REGEX.captures(c))
        .filter_map(|cap| cap[1].parse().ok())
        .collect();
    weeks.sort_unstable();
    weeks.dedup();
    weeks
}
