use log::{debug, info};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

use crate::error::NavError;
use crate::pages::Page;
use crate::state::{Snapshot, StateStore};

/// Upper bound of the undo log. Older actions are dropped silently.
pub const MAX_ACTIONS: usize = 10;

/// One undoable user action.
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Navigate {
        from: Page,
        to: Page,
        prior_stack: Vec<Page>,
    },
    Upload {
        file_name: String,
        prior: Snapshot,
    },
}

/// What an undo put back.
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Undone {
    Navigation { from: Page, to: Page },
    Upload { file_name: String },
}

impl fmt::Display for Undone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Undone::Navigation { from, to } => write!(
                f,
                "已撤销导航操作：{} → {}",
                to.config().title,
                from.config().title
            ),
            Undone::Upload { file_name } => write!(f, "已撤销数据上传操作：{file_name}"),
        }
    }
}

/// Current page, back stack and undo log of one session.
///
/// The top of `stack` is always `current`.
#[derive(Clone, Debug)]
pub struct PageManager {
    current: Page,
    stack: Vec<Page>,
    actions: VecDeque<Action>,
}

impl Default for PageManager {
    fn default() -> Self {
        PageManager {
            current: Page::Home,
            stack: vec![Page::Home],
            actions: VecDeque::with_capacity(MAX_ACTIONS),
        }
    }
}

impl PageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Page {
        self.current
    }

    pub fn stack(&self) -> &[Page] {
        &self.stack
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Navigate by page key, as the front-end sends it.
    ///
    /// # Arguments
    /// * `key` - Page key such as `"sales"` or `"score_center"`
    /// * `state` - Loaded data, checked against the page's requirements
    ///
    /// # Returns
    /// The page now shown, or why navigation was refused
    ///
    /// # Examples
    /// ```
    /// use salesboard::navigation::PageManager;
    /// use salesboard::{NavError, Page, StateStore};
    ///
    /// let mut pages = PageManager::new();
    /// let state = StateStore::new();
    /// assert_eq!(pages.navigate_to("sales_center", &state), Ok(Page::SalesCenter));
    /// assert!(matches!(pages.navigate_to("sales", &state), Err(NavError::MissingData { .. })));
    /// ```
    pub fn navigate_to(&mut self, key: &str, state: &StateStore) -> Result<Page, NavError> {
        let target = Page::from_key(key).ok_or_else(|| NavError::UnknownPage(key.to_string()))?;
        self.navigate(target, state)
    }

    /// Open `target`, pushing it onto the back stack unless it is already on
    /// top. Refused without any state change when a required table is missing.
    pub fn navigate(&mut self, target: Page, state: &StateStore) -> Result<Page, NavError> {
        let mut stack = self.stack.clone();
        if stack.last() != Some(&target) {
            stack.push(target);
        }
        self.commit(target, stack, state)
    }

    /// Pop the back stack and show the page underneath. With nothing to pop,
    /// go home.
    pub fn go_back(&mut self, state: &StateStore) -> Result<Page, NavError> {
        let mut stack = self.stack.clone();
        let target = if stack.len() > 1 {
            stack.pop();
            stack[stack.len() - 1]
        } else {
            stack = vec![Page::Home];
            Page::Home
        };
        self.commit(target, stack, state)
    }

    pub fn go_home(&mut self, state: &StateStore) -> Result<Page, NavError> {
        self.commit(Page::Home, vec![Page::Home], state)
    }

    fn commit(&mut self, target: Page, stack: Vec<Page>, state: &StateStore) -> Result<Page, NavError> {
        check_requirements(target, state)?;

        let prior_stack = std::mem::replace(&mut self.stack, stack);
        self.record(Action::Navigate {
            from: self.current,
            to: target,
            prior_stack,
        });
        debug!("navigate {} -> {}", self.current, target);
        self.current = target;
        Ok(target)
    }

    /// Remember the tables that an upload is about to replace.
    pub fn record_upload(&mut self, file_name: &str, prior: Snapshot) {
        self.record(Action::Upload {
            file_name: file_name.to_string(),
            prior,
        });
    }

    fn record(&mut self, action: Action) {
        if self.actions.len() >= MAX_ACTIONS {
            self.actions.pop_front();
        }
        self.actions.push_back(action);
    }

    /// Revert the most recent action.
    ///
    /// A navigation is restored as-is, without checking page requirements
    /// again: the restored page was reachable when it was left.
    pub fn undo_last_action(&mut self, state: &mut StateStore) -> Result<Undone, NavError> {
        let action = self.actions.pop_back().ok_or(NavError::NothingToUndo)?;

        let undone = match action {
            Action::Navigate {
                from,
                to,
                prior_stack,
            } => {
                self.current = from;
                self.stack = prior_stack;
                Undone::Navigation { from, to }
            }
            Action::Upload { file_name, prior } => {
                state.restore(prior);
                Undone::Upload { file_name }
            }
        };

        info!("{undone}");
        Ok(undone)
    }
}

fn check_requirements(target: Page, state: &StateStore) -> Result<(), NavError> {
    match target
        .requirements()
        .iter()
        .find(|kind| state.table(**kind).is_none())
    {
        Some(missing) => Err(NavError::MissingData {
            page: target,
            missing: *missing,
        }),
        None => Ok(()),
    }
}
