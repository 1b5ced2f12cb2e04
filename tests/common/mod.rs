#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use salesboard::records::columns::*;
use salesboard::{Table, TableKind, Value};

// Helper function to write tables into an in-memory xlsx workbook
pub fn workbook(sheets: &[(&str, &Table)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (c, column) in table.columns().iter().enumerate() {
            worksheet.write_string(0, c as u16, column).unwrap();
        }
        for row in table.rows() {
            let r = (row.index() + 1) as u32;
            for (c, value) in row.values().iter().enumerate() {
                match value {
                    Value::Number(n) => {
                        worksheet.write_number(r, c as u16, *n).unwrap();
                    }
                    Value::Text(s) => {
                        worksheet.write_string(r, c as u16, s).unwrap();
                    }
                    Value::Empty => {}
                }
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

// Helper function for a workbook with the standard sheet names
pub fn export(tables: &[(TableKind, &Table)]) -> Vec<u8> {
    let named: Vec<(&str, &Table)> = tables.iter().map(|(k, t)| (k.sheet_name(), *t)).collect();
    workbook(&named)
}

fn text(s: &str) -> Value {
    Value::from(s)
}

fn num(n: f64) -> Value {
    Value::from(n)
}

/// Two members per team; team `i` gets weighted score `90 - 10 * i`.
pub fn score_table(teams: &[&str]) -> Table {
    let mut table = Table::new([EMPLOYEE, TEAM, PERSONAL_TOTAL, WEIGHTED_TEAM_SCORE, STAT_MONTH]);
    for (i, team) in teams.iter().enumerate() {
        let weighted = 90.0 - 10.0 * i as f64;
        for member in 0..2 {
            table.push_row(vec![
                text(&format!("{team}{member}")),
                text(team),
                num(50.0 + member as f64 * 10.0),
                num(weighted),
                text("2024年5月"),
            ]);
        }
    }
    table
}

/// Employee rows as (name, sales, payment, overdue) in 元, plus a `合计` row.
pub fn sales_table(rows: &[(&str, f64, f64, f64)]) -> Table {
    let mut table = Table::new([
        EMPLOYEE,
        MONTH_SALES,
        MONTH_PAYMENT,
        OVERDUE_BALANCE,
        STAT_MONTH,
        "第1周销售额",
        "第1周回款合计",
    ]);
    let mut totals = (0.0, 0.0, 0.0);
    for (name, sales, payment, overdue) in rows {
        table.push_row(vec![
            text(name),
            num(*sales),
            num(*payment),
            num(*overdue),
            text("2024年5月"),
            num(sales / 2.0),
            num(payment / 2.0),
        ]);
        totals = (totals.0 + sales, totals.1 + payment, totals.2 + overdue);
    }
    table.push_row(vec![
        text(TOTAL_ROW),
        num(totals.0),
        num(totals.1),
        num(totals.2),
        Value::Empty,
        num(totals.0 / 2.0),
        num(totals.1 / 2.0),
    ]);
    table
}

/// Department rows as (name, sales, on-time, overdue collections, balance).
pub fn department_table(rows: &[(&str, f64, f64, f64, f64)]) -> Table {
    let mut table = Table::new([
        DEPARTMENT,
        MONTH_SALES,
        MONTH_PAYMENT_ON_TIME,
        MONTH_PAYMENT_OVERDUE,
        OVERDUE_BALANCE,
    ]);
    for (name, sales, on_time, overdue, balance) in rows {
        table.push_row(vec![text(name), num(*sales), num(*on_time), num(*overdue), num(*balance)]);
    }
    table.push_row(vec![text(TOTAL_ROW), Value::Empty, Value::Empty, Value::Empty, Value::Empty]);
    table
}

pub fn ranking_table() -> Table {
    let rows: [(&str, &str, f64); 5] = [
        ("第1周销售额", "张三", 5000.0),
        ("第1周销售额", "李四", 8000.0),
        ("本月销售额", "李四", 30000.0),
        ("本月回款合计", "张三", 12000.0),
        ("超期未收回账款", "张三", 2000.0),
    ];
    let mut table = Table::new([RANKING_TYPE, RANKING_NAME, AMOUNT]);
    for (category, name, amount) in rows {
        table.push_row(vec![text(category), text(name), num(amount)]);
    }
    table
}
