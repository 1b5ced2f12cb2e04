//! One renderer per page.
//!
//! A renderer reads the session's [`StateStore`] and returns a serializable
//! view; the browser front-end draws it. Renderers never mutate state.

use serde::Serialize;

use crate::error::{TrendError, ValidationError, ViewError};
use crate::loader::{self, DataInfo, GroupRank, Leaderboard};
use crate::pages::Page;
use crate::rankings::{self, MonthlyRanking, RankingCategory};
use crate::records::columns::TEAM;
use crate::records::{DepartmentSalesRecord, SalesRecord, ScoreRecord};
use crate::sales::{self, Badges, CompletionBuckets, SalesOverview, Task, WeekTotal};
use crate::state::{StateStore, Summary};
use crate::table::{Table, TableKind};
use crate::trends::{self, EntityAverage, Metric, Pivot, TrendTable};

/// Departments preselected on the department comparison page.
const DEFAULT_DEPARTMENTS: usize = 3;

/// Selections made on the page, sent back with each render.
///
/// `None` means "nothing chosen yet" and picks the page's default; an empty
/// list is an explicit empty selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderRequest {
    pub employees: Option<Vec<String>>,
    pub departments: Option<Vec<String>>,
    /// Employee whose score breakdown is shown on the scores page.
    pub employee: Option<String>,
}

/// Split a comma-separated selection, dropping blanks.
pub fn parse_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PageView {
    Home(HomeView),
    Hub(HubView),
    Leaderboard(LeaderboardView),
    Scores(ScoresView),
    Sales(SalesView),
    DepartmentSales(DepartmentSalesView),
    Ranking(RankingView),
    OverallTrends(OverallTrendsView),
    EntityTrends(EntityTrendsView),
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SheetStatus {
    pub kind: TableKind,
    pub sheet_name: &'static str,
    pub loaded: bool,
    pub rows: usize,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct HistoryItem {
    pub month: String,
    pub file_name: String,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct HomeView {
    pub summary: Summary,
    pub sheets: Vec<SheetStatus>,
    pub data_info: Option<DataInfo>,
    pub history: Vec<HistoryItem>,
    pub can_access_score_center: bool,
    pub can_access_sales_center: bool,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct MenuItem {
    pub page: Page,
    pub title: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub available: bool,
    pub missing: Vec<TableKind>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct HubView {
    pub hub: Page,
    pub items: Vec<MenuItem>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct LeaderboardView {
    pub month: Option<String>,
    #[serde(flatten)]
    pub board: Leaderboard,
    /// Fewer than four teams: red and black lists share members.
    pub overlapping: bool,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TeamScores {
    pub group: GroupRank,
    pub members: Vec<ScoreRecord>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ScoresView {
    pub teams: Vec<TeamScores>,
    pub employees: Vec<String>,
    pub detail: Option<ScoreRecord>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SalesView {
    pub overview: SalesOverview,
    pub weekly_totals: Vec<WeekTotal>,
    pub badges: Badges,
    pub sales_completion: Option<CompletionBuckets>,
    pub payment_completion: Option<CompletionBuckets>,
    pub employees: Vec<SalesRecord>,
    pub total: Option<SalesRecord>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DepartmentSalesView {
    pub departments: Vec<DepartmentSalesRecord>,
    pub total: Option<SalesRecord>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct RankingView {
    pub weekly_sales: Vec<RankingCategory>,
    pub weekly_payment: Vec<RankingCategory>,
    pub monthly: MonthlyRanking,
    pub overdue_warning: Option<RankingCategory>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct OverallTrendsView {
    pub months: Vec<String>,
    pub trend: TrendTable,
}

/// Employee or department comparison.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct EntityTrendsView {
    pub page: Page,
    pub candidates: Vec<String>,
    pub selected: Vec<String>,
    pub trend: Option<TrendTable>,
    pub averages: Vec<EntityAverage>,
    pub pivots: Vec<Pivot>,
    /// Shown instead of the charts when the selection yields nothing.
    pub notice: Option<String>,
}

/// Render `page` from the session state.
pub fn render(page: Page, state: &StateStore, request: &RenderRequest) -> Result<PageView, ViewError> {
    match page {
        Page::Home => Ok(PageView::Home(home(state))),
        Page::ScoreCenter | Page::SalesCenter | Page::HistoryCompare => Ok(PageView::Hub(hub(page, state))),
        Page::Leaderboard => leaderboard(state).map(PageView::Leaderboard),
        Page::Scores => scores(state, request).map(PageView::Scores),
        Page::Sales => sales_page(state).map(PageView::Sales),
        Page::DepartmentSales => department_sales(state).map(PageView::DepartmentSales),
        Page::Ranking => ranking(state).map(PageView::Ranking),
        Page::OverallTrends => overall_trends(state).map(PageView::OverallTrends),
        Page::EmployeeDetails | Page::DepartmentDetails => entity_trends(page, state, request).map(PageView::EntityTrends),
    }
}

/// The table a leaf page reads, checked for the columns it needs.
fn usable_table(state: &StateStore, kind: TableKind) -> Result<&Table, ViewError> {
    let table = state.table(kind).ok_or(ViewError::MissingTable(kind))?;
    loader::validate(kind, Some(table))?;
    Ok(table)
}

pub fn home(state: &StateStore) -> HomeView {
    let sheets = TableKind::ALL
        .into_iter()
        .map(|kind| SheetStatus {
            kind,
            sheet_name: kind.sheet_name(),
            loaded: state.has_table(kind),
            rows: state.table(kind).map_or(0, Table::len),
        })
        .collect();

    HomeView {
        summary: state.summary(),
        sheets,
        data_info: state.is_loaded().then(|| loader::data_info(state.tables())),
        history: state
            .history()
            .iter()
            .map(|e| HistoryItem {
                month: e.month.clone(),
                file_name: e.file_name.clone(),
            })
            .collect(),
        can_access_score_center: state.can_access_score_center(),
        can_access_sales_center: state.can_access_sales_center(),
    }
}

/// Menu of a hub page. An item is available when navigating to it would
/// succeed; history pages also need two months on file.
pub fn hub(page: Page, state: &StateStore) -> HubView {
    let items = page
        .menu_items()
        .iter()
        .map(|&item| {
            let config = item.config();
            let missing: Vec<TableKind> = item
                .requirements()
                .iter()
                .copied()
                .filter(|k| state.table(*k).is_none())
                .collect();
            let enough_history = page != Page::HistoryCompare || state.history().len() >= trends::MIN_MONTHS;
            MenuItem {
                page: item,
                title: config.title,
                icon: config.icon,
                description: config.description,
                available: missing.is_empty() && enough_history,
                missing,
            }
        })
        .collect();

    HubView { hub: page, items }
}

fn leaderboard(state: &StateStore) -> Result<LeaderboardView, ViewError> {
    let score = usable_table(state, TableKind::Score)?;
    let board = loader::leaderboard(score).ok_or_else(no_teams)?;
    Ok(LeaderboardView {
        month: loader::stat_month(Some(score)),
        overlapping: board.groups.len() < 4,
        board,
    })
}

fn no_teams() -> ValidationError {
    ValidationError::MissingColumns {
        kind: TableKind::Score,
        missing: vec![TEAM.to_string()],
    }
}

fn scores(state: &StateStore, request: &RenderRequest) -> Result<ScoresView, ViewError> {
    let score = usable_table(state, TableKind::Score)?;
    let groups = loader::group_ranking(score).ok_or_else(no_teams)?;
    let records = ScoreRecord::all(score);

    let teams = groups
        .into_iter()
        .map(|group| {
            let mut members: Vec<ScoreRecord> = records
                .iter()
                .filter(|r| r.team.as_deref() == Some(group.team.as_str()))
                .cloned()
                .collect();
            members.sort_by(|a, b| {
                b.personal_total
                    .unwrap_or(f64::MIN)
                    .total_cmp(&a.personal_total.unwrap_or(f64::MIN))
            });
            TeamScores { group, members }
        })
        .collect();

    let employees: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
    let wanted = request.employee.as_ref().or(employees.first());
    let detail = wanted.and_then(|name| records.iter().find(|r| &r.name == name).cloned());

    Ok(ScoresView { teams, employees, detail })
}

fn sales_page(state: &StateStore) -> Result<SalesView, ViewError> {
    let table = usable_table(state, TableKind::Sales)?;
    Ok(SalesView {
        overview: sales::overview(table),
        weekly_totals: sales::weekly_totals(table),
        badges: sales::badges(table),
        sales_completion: sales::completion_buckets(table, Task::Sales),
        payment_completion: sales::completion_buckets(table, Task::Payment),
        employees: SalesRecord::employees(table),
        total: SalesRecord::total(table),
    })
}

fn department_sales(state: &StateStore) -> Result<DepartmentSalesView, ViewError> {
    let table = usable_table(state, TableKind::DepartmentSales)?;
    Ok(DepartmentSalesView {
        departments: DepartmentSalesRecord::departments(table),
        total: DepartmentSalesRecord::total(table),
    })
}

fn ranking(state: &StateStore) -> Result<RankingView, ViewError> {
    let table = usable_table(state, TableKind::Ranking)?;
    Ok(RankingView {
        weekly_sales: rankings::weekly_sales(table),
        weekly_payment: rankings::weekly_payment(table),
        monthly: rankings::monthly(table),
        overdue_warning: rankings::overdue_warning(table),
    })
}

fn overall_trends(state: &StateStore) -> Result<OverallTrendsView, ViewError> {
    let history = state.history();
    trends::ensure_comparable(history)?;
    Ok(OverallTrendsView {
        months: trends::sorted_months(history).iter().map(|e| e.month.clone()).collect(),
        trend: trends::overall_trend(history),
    })
}

fn entity_trends(page: Page, state: &StateStore, request: &RenderRequest) -> Result<EntityTrendsView, ViewError> {
    let history = state.history();
    trends::ensure_comparable(history)?;

    let (candidates, requested, default_count) = if page == Page::EmployeeDetails {
        (trends::all_employees(history), &request.employees, 1)
    } else {
        (trends::all_departments(history), &request.departments, DEFAULT_DEPARTMENTS)
    };
    if candidates.is_empty() {
        let noun = if page == Page::EmployeeDetails { "员工" } else { "部门" };
        return Err(TrendError::NoData(noun).into());
    }

    let selected: Vec<String> = match requested {
        Some(names) => names.clone(),
        None => candidates.iter().take(default_count).cloned().collect(),
    };
    let result = if page == Page::EmployeeDetails {
        trends::employee_trend(history, &selected)
    } else {
        trends::department_trend(history, &selected)
    };

    let mut view = EntityTrendsView {
        page,
        candidates,
        selected,
        trend: None,
        averages: Vec::new(),
        pivots: Vec::new(),
        notice: None,
    };
    match result {
        Ok(trend) => {
            view.averages = trends::entity_averages(&trend);
            view.pivots = Metric::ALL.iter().map(|m| trends::pivot(&trend, *m)).collect();
            view.trend = Some(trend);
        }
        // An empty or unmatched selection keeps the page open with a hint.
        Err(e @ (TrendError::NoSelection(_) | TrendError::NoData(_))) => view.notice = Some(e.to_string()),
        Err(e) => return Err(e.into()),
    }
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::columns::*;
    use crate::table::Value;

    #[test]
    fn hub_marks_missing_tables() {
        let mut state = StateStore::new();
        state.set_table(
            TableKind::Ranking,
            Some(Table::new([RANKING_TYPE, AMOUNT]).with_row([Value::from("本月销售额"), Value::from(1.0)])),
        );
        let view = hub(Page::SalesCenter, &state);
        let available: Vec<bool> = view.items.iter().map(|i| i.available).collect();
        assert_eq!(available, vec![true, false, false]);
        assert_eq!(view.items[1].missing, vec![TableKind::Sales]);
    }

    #[test]
    fn leaf_without_table_is_an_error() {
        let state = StateStore::new();
        let err = render(Page::Sales, &state, &RenderRequest::default()).unwrap_err();
        assert_eq!(err, ViewError::MissingTable(TableKind::Sales));
    }

    #[test]
    fn history_pages_need_two_months() {
        let state = StateStore::new();
        let err = render(Page::OverallTrends, &state, &RenderRequest::default()).unwrap_err();
        assert_eq!(err, ViewError::Trend(TrendError::NotEnoughMonths));
    }

    fn score_with_teams(teams: &[&str]) -> Table {
        let mut table = Table::new([EMPLOYEE, TEAM, PERSONAL_TOTAL, WEIGHTED_TEAM_SCORE]);
        for (i, team) in teams.iter().enumerate() {
            table.push_row(vec![
                Value::from(format!("{team}成员")),
                Value::from(*team),
                Value::from(60.0),
                Value::from(90.0 - i as f64),
            ]);
        }
        table
    }

    fn leaderboard_for(teams: &[&str]) -> LeaderboardView {
        let mut state = StateStore::new();
        state.set_table(TableKind::Score, Some(score_with_teams(teams)));
        match render(Page::Leaderboard, &state, &RenderRequest::default()) {
            Ok(PageView::Leaderboard(view)) => view,
            other => panic!("unexpected render result {other:?}"),
        }
    }

    #[test]
    fn leaderboard_flags_overlap_below_four_teams() {
        assert!(!leaderboard_for(&["一队", "二队", "三队", "四队"]).overlapping);

        let three = leaderboard_for(&["一队", "二队", "三队"]);
        assert!(three.overlapping);
        let shared: Vec<&str> = three
            .board
            .red
            .iter()
            .filter(|r| three.board.black.iter().any(|b| b.name == r.name))
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(shared, vec!["二队成员"]);

        let two = leaderboard_for(&["一队", "二队"]);
        assert!(two.overlapping);
        assert_eq!(two.board.red.len(), two.board.black.len());
    }

    #[test]
    fn parse_names_trims_and_skips_blanks() {
        assert_eq!(parse_names(" 张三, ,李四 "), vec!["张三", "李四"]);
    }
}
