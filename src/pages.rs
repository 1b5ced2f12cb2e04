use serde::{Deserialize, Serialize};
use std::fmt;

use crate::table::TableKind;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    ScoreCenter,
    SalesCenter,
    HistoryCompare,
    Leaderboard,
    Scores,
    Sales,
    DepartmentSales,
    Ranking,
    OverallTrends,
    EmployeeDetails,
    DepartmentDetails,
}

/// Static description of a page: what the menus and breadcrumbs show.
#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
pub struct PageConfig {
    pub key: &'static str,
    pub title: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub parent: Option<Page>,
    pub show_in_nav: bool,
    pub order: Option<u8>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Crumb {
    pub page: Page,
    pub label: &'static str,
    pub icon: &'static str,
}

impl Page {
    pub const ALL: [Page; 12] = [
        Page::Home,
        Page::ScoreCenter,
        Page::SalesCenter,
        Page::HistoryCompare,
        Page::Leaderboard,
        Page::Scores,
        Page::Sales,
        Page::DepartmentSales,
        Page::Ranking,
        Page::OverallTrends,
        Page::EmployeeDetails,
        Page::DepartmentDetails,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Page::ALL.into_iter().find(|p| p.key() == key)
    }

    pub fn key(self) -> &'static str {
        self.config().key
    }

    pub fn config(self) -> PageConfig {
        let (key, title, icon, description, parent, order) = match self {
            Page::Home => ("home", "主页", "🏠", "销售积分红黑榜系统主页", None, Some(0)),
            Page::ScoreCenter => ("score_center", "积分中心", "🏆", "员工积分统计与团队排名分析", None, Some(1)),
            Page::SalesCenter => ("sales_center", "销售中心", "💰", "销售数据统计与回款分析", None, Some(2)),
            Page::HistoryCompare => ("history_compare", "历史对比", "📅", "历史数据对比分析", None, Some(3)),
            Page::Leaderboard => ("leaderboard", "红黑榜", "🏆", "月度团队红黑榜排名", Some(Page::ScoreCenter), None),
            Page::Scores => ("scores", "积分统计", "📊", "员工积分详细统计", Some(Page::ScoreCenter), None),
            Page::Sales => ("sales", "员工销售统计", "👥", "员工销售业绩统计", Some(Page::SalesCenter), None),
            Page::DepartmentSales => ("department_sales", "部门销售统计", "🏢", "部门销售业绩统计", Some(Page::SalesCenter), None),
            Page::Ranking => ("ranking", "销售回款排名", "📈", "销售回款超期账款排名分析", Some(Page::SalesCenter), None),
            Page::OverallTrends => ("overall_trends", "总体趋势", "📈", "总体趋势分析", Some(Page::HistoryCompare), None),
            Page::EmployeeDetails => ("employee_details", "员工详情", "👥", "员工详情分析", Some(Page::HistoryCompare), None),
            Page::DepartmentDetails => ("department_details", "部门详情", "🏢", "部门详情分析", Some(Page::HistoryCompare), None),
        };
        PageConfig {
            key,
            title,
            icon,
            description,
            parent,
            show_in_nav: parent.is_none(),
            order,
        }
    }

    /// Tables that must be loaded before the page can be opened.
    ///
    /// Hubs have no requirement of their own; the history pages read the
    /// history map and check it themselves.
    pub fn requirements(self) -> &'static [TableKind] {
        match self {
            Page::Leaderboard | Page::Scores => &[TableKind::Score],
            Page::Sales => &[TableKind::Sales],
            Page::DepartmentSales => &[TableKind::DepartmentSales],
            Page::Ranking => &[TableKind::Ranking],
            Page::Home
            | Page::ScoreCenter
            | Page::SalesCenter
            | Page::HistoryCompare
            | Page::OverallTrends
            | Page::EmployeeDetails
            | Page::DepartmentDetails => &[],
        }
    }

    /// Leaf pages listed on a hub, in menu order.
    pub fn menu_items(self) -> &'static [Page] {
        match self {
            Page::ScoreCenter => &[Page::Leaderboard, Page::Scores],
            Page::SalesCenter => &[Page::Ranking, Page::Sales, Page::DepartmentSales],
            Page::HistoryCompare => &[Page::OverallTrends, Page::EmployeeDetails, Page::DepartmentDetails],
            _ => &[],
        }
    }

    /// Home, then the parent hub if any, then the page itself.
    pub fn breadcrumb(self) -> Vec<Crumb> {
        let crumb = |page: Page| {
            let config = page.config();
            Crumb {
                page,
                label: config.title,
                icon: config.icon,
            }
        };

        let mut trail = vec![crumb(Page::Home)];
        if self != Page::Home {
            if let Some(parent) = self.config().parent {
                trail.push(crumb(parent));
            }
            trail.push(crumb(self));
        }
        trail
    }

    /// Top-level pages for the navigation bar, in order.
    pub fn nav_pages() -> Vec<Page> {
        let mut pages: Vec<Page> = Page::ALL
            .into_iter()
            .filter(|p| p.config().show_in_nav)
            .collect();
        pages.sort_by_key(|p| p.config().order);
        pages
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for page in Page::ALL {
            assert_eq!(Page::from_key(page.key()), Some(page));
        }
        assert_eq!(Page::from_key("nope"), None);
    }

    #[test]
    fn breadcrumb_includes_parent_hub() {
        let trail: Vec<Page> = Page::Leaderboard.breadcrumb().iter().map(|c| c.page).collect();
        assert_eq!(trail, vec![Page::Home, Page::ScoreCenter, Page::Leaderboard]);
        assert_eq!(Page::Home.breadcrumb().len(), 1);
    }

    #[test]
    fn leaf_pages_need_their_table() {
        assert_eq!(Page::Leaderboard.requirements(), &[TableKind::Score]);
        assert_eq!(Page::Scores.requirements(), &[TableKind::Score]);
        assert_eq!(Page::Sales.requirements(), &[TableKind::Sales]);
        assert_eq!(Page::DepartmentSales.requirements(), &[TableKind::DepartmentSales]);
        assert_eq!(Page::Ranking.requirements(), &[TableKind::Ranking]);

        for page in [
            Page::Home,
            Page::ScoreCenter,
            Page::SalesCenter,
            Page::HistoryCompare,
            Page::OverallTrends,
            Page::EmployeeDetails,
            Page::DepartmentDetails,
        ] {
            assert!(page.requirements().is_empty(), "{page} should be open");
        }
    }

    #[test]
    fn nav_lists_hubs_in_order() {
        assert_eq!(
            Page::nav_pages(),
            vec![Page::Home, Page::ScoreCenter, Page::SalesCenter, Page::HistoryCompare]
        );
    }
}
