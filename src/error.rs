//! Error types shared across the dashboard.
//!
//! Every error here ends up as a transient, user-visible message. None of them
//! leave a session unusable.

use thiserror::Error;

use crate::pages::Page;
use crate::table::TableKind;

/// Whole-file failures. When one of these is returned no table is produced
/// and the session state is left untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("未选择文件")]
    NoFile,

    #[error("文件格式必须为Excel(.xlsx)")]
    NotXlsx,

    #[error("文件大小不能超过{limit_mb}MB")]
    TooLarge { limit_mb: usize },

    #[error(
        "请上传员工销售回款统计_XXXX年X月.xlsx文件，文件中应包含以下工作表之一：员工积分数据、销售回款数据统计、部门销售回款统计、销售回款超期账款排名"
    )]
    NoExpectedSheets,

    #[error("读取文件时出错: {0}")]
    Workbook(String),

    #[error("读取文件时出错: {0}")]
    Io(#[from] std::io::Error),
}

/// A single sheet that exists but cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind}: 数据为空")]
    Empty { kind: TableKind },

    #[error("{kind}: 缺少必要列: {}", missing.join(", "))]
    MissingColumns { kind: TableKind, missing: Vec<String> },

    #[error("工作表 {sheet} 解析失败: {reason}")]
    Parse { sheet: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("页面 {0} 不存在")]
    UnknownPage(String),

    #[error("请先上传所需的数据文件: {page} 需要 {missing}")]
    MissingData { page: Page, missing: TableKind },

    #[error("没有可撤销的操作")]
    NothingToUndo,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendError {
    #[error("需要至少2个月份的数据才能进行趋势分析")]
    NotEnoughMonths,

    #[error("请选择至少一个{0}进行对比")]
    NoSelection(&'static str),

    #[error("没有找到所选{0}的历史数据")]
    NoData(&'static str),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV 导出失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX 导出失败: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("导出编码失败: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("导出失败: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised by a page renderer. The session falls back to the home page when
/// the current page cannot be rendered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("请先上传{0}数据文件")]
    MissingTable(TableKind),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Trend(#[from] TrendError),
}
