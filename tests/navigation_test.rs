mod common;

use common::*;
use salesboard::navigation::{Action, MAX_ACTIONS, Undone};
use salesboard::{NavError, Page, PageManager, StateStore, TableKind};

// Helper function to build a store holding only a sales table
fn sales_state() -> StateStore {
    let mut state = StateStore::new();
    state.set_table(TableKind::Sales, Some(sales_table(&[("张三", 1.0, 1.0, 0.0)])));
    state
}

#[test]
fn test_gating_blocks_page_without_data() {
    let state = sales_state();
    let mut pages = PageManager::new();

    let err = pages.navigate(Page::Leaderboard, &state).unwrap_err();
    assert_eq!(
        err,
        NavError::MissingData {
            page: Page::Leaderboard,
            missing: TableKind::Score
        }
    );
    assert_eq!(pages.current(), Page::Home);
    assert_eq!(pages.stack(), &[Page::Home]);
    assert_eq!(pages.action_count(), 0);

    assert_eq!(pages.navigate(Page::Sales, &state), Ok(Page::Sales));
    assert_eq!(pages.current(), Page::Sales);
}

#[test]
fn test_unknown_key_is_rejected() {
    let state = StateStore::new();
    let mut pages = PageManager::new();
    assert_eq!(
        pages.navigate_to("settings", &state),
        Err(NavError::UnknownPage("settings".to_string()))
    );
    assert_eq!(pages.navigate_to("sales_center", &state), Ok(Page::SalesCenter));
}

#[test]
fn test_action_log_keeps_last_ten() {
    let state = StateStore::new();
    let mut pages = PageManager::new();

    let hubs = [Page::ScoreCenter, Page::SalesCenter];
    for i in 0..11 {
        pages.navigate(hubs[i % 2], &state).unwrap();
    }
    assert_eq!(pages.action_count(), MAX_ACTIONS);

    // The first navigation (Home -> ScoreCenter) was evicted.
    let first = pages.actions().next().unwrap();
    assert!(matches!(
        first,
        Action::Navigate {
            from: Page::ScoreCenter,
            to: Page::SalesCenter,
            ..
        }
    ));
}

#[test]
fn test_back_and_home() {
    let state = sales_state();
    let mut pages = PageManager::new();

    pages.navigate(Page::SalesCenter, &state).unwrap();
    pages.navigate(Page::Sales, &state).unwrap();
    // Navigating to the page on top does not push it twice.
    pages.navigate(Page::Sales, &state).unwrap();
    assert_eq!(pages.stack(), &[Page::Home, Page::SalesCenter, Page::Sales]);

    assert_eq!(pages.go_back(&state), Ok(Page::SalesCenter));
    assert_eq!(pages.stack(), &[Page::Home, Page::SalesCenter]);

    assert_eq!(pages.go_home(&state), Ok(Page::Home));
    assert_eq!(pages.stack(), &[Page::Home]);

    assert_eq!(pages.go_back(&state), Ok(Page::Home));
    assert_eq!(pages.stack(), &[Page::Home]);
}

#[test]
fn test_undo_navigation_restores_page_and_stack() {
    let state = sales_state();
    let mut undo_state = state.clone();
    let mut pages = PageManager::new();

    pages.navigate(Page::SalesCenter, &state).unwrap();
    pages.navigate(Page::Sales, &state).unwrap();
    pages.go_back(&state).unwrap();

    let undone = pages.undo_last_action(&mut undo_state).unwrap();
    assert_eq!(
        undone,
        Undone::Navigation {
            from: Page::Sales,
            to: Page::SalesCenter
        }
    );
    assert_eq!(pages.current(), Page::Sales);
    assert_eq!(pages.stack(), &[Page::Home, Page::SalesCenter, Page::Sales]);
}

#[test]
fn test_undo_skips_gating() {
    let mut state = sales_state();
    let mut pages = PageManager::new();

    pages.navigate(Page::Sales, &state).unwrap();
    pages.go_home(&state).unwrap();
    state.clear_all();

    pages.undo_last_action(&mut state).unwrap();
    assert_eq!(pages.current(), Page::Sales);
}

#[test]
fn test_undo_upload_restores_tables() {
    let mut state = sales_state();
    state.set_file_name(Some("四月.xlsx".to_string()));
    let mut pages = PageManager::new();

    pages.record_upload("五月.xlsx", state.snapshot());
    state.set_table(TableKind::Score, Some(score_table(&["红队"])));
    state.set_table(TableKind::Sales, None);
    state.set_file_name(Some("五月.xlsx".to_string()));

    let undone = pages.undo_last_action(&mut state).unwrap();
    assert_eq!(undone.to_string(), "已撤销数据上传操作：五月.xlsx");
    assert!(state.has_table(TableKind::Sales));
    assert!(!state.has_table(TableKind::Score));
    assert_eq!(state.file_name(), Some("四月.xlsx"));

    assert_eq!(pages.undo_last_action(&mut state), Err(NavError::NothingToUndo));
}
