use log::{info, warn};
use serde::Serialize;
use std::path::Path;

use crate::error::{LoadError, NavError, TrendError};
use crate::loader::{self, DataInfo, DEFAULT_MAX_UPLOAD_BYTES};
use crate::navigation::{PageManager, Undone};
use crate::pages::{Crumb, Page};
use crate::state::{HistoryEntry, StateStore, Summary};
use crate::table::{TableKind, TableSet};
use crate::trends::{self, TrendKind, TrendTable};
use crate::views::{self, PageView, RenderRequest};

/// Result of a main upload: headline figures plus one message per sheet that
/// loaded but will not render.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub info: DataInfo,
    pub warnings: Vec<String>,
}

/// A rendered page with the chrome around it.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Rendered {
    pub page: Page,
    pub title: &'static str,
    pub breadcrumb: Vec<Crumb>,
    pub nav: Vec<Page>,
    pub can_undo: bool,
    /// Set when the requested page failed and home is shown instead.
    pub error: Option<String>,
    pub view: PageView,
}

/// Everything one user works with: loaded tables, history, and where they are
/// in the page tree.
#[derive(Clone, Debug)]
pub struct Session {
    state: StateStore,
    pages: PageManager,
    max_upload_bytes: usize,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl Session {
    pub fn new(max_upload_bytes: usize) -> Self {
        Session {
            state: StateStore::new(),
            pages: PageManager::new(),
            max_upload_bytes,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn pages(&self) -> &PageManager {
        &self.pages
    }

    pub fn current_page(&self) -> Page {
        self.pages.current()
    }

    pub fn summary(&self) -> Summary {
        self.state.summary()
    }

    /// Load a workbook from disk as the session's starting data. Not undoable.
    pub fn preload(&mut self, path: &Path) -> Result<DataInfo, LoadError> {
        let tables = loader::load_workbook_path(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("preloaded {file_name}");
        let info = loader::data_info(&tables);
        self.state.set_tables(tables);
        self.state.set_file_name(Some(file_name));
        Ok(info)
    }

    /// Replace the current tables with an uploaded workbook.
    ///
    /// On error nothing changes. On success the previous tables are kept in
    /// the undo log.
    ///
    /// # Arguments
    /// * `file_name` - Name of the uploaded file; must end in `.xlsx`
    /// * `bytes` - Raw workbook content
    ///
    /// # Returns
    /// Headline figures and per-sheet warnings, or the reason the file was refused
    ///
    /// # Examples
    /// ```no_run
    /// use salesboard::Session;
    ///
    /// let mut session = Session::default();
    /// let bytes = std::fs::read("员工销售回款统计_2024年5月.xlsx").unwrap();
    /// match session.upload("员工销售回款统计_2024年5月.xlsx", bytes) {
    ///     Ok(outcome) => println!("{} teams", outcome.info.total_teams),
    ///     Err(e) => eprintln!("{}", e),
    /// }
    /// ```
    pub fn upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome, LoadError> {
        loader::validate_upload(file_name, bytes.len(), self.max_upload_bytes)?;
        let tables = loader::load_workbook_bytes(bytes)?;

        let warnings = sheet_warnings(&tables);
        let info = loader::data_info(&tables);

        self.pages.record_upload(file_name, self.state.snapshot());
        self.state.set_tables(tables);
        self.state.set_file_name(Some(file_name.to_string()));
        info!("uploaded {file_name}");

        Ok(UploadOutcome {
            file_name: file_name.to_string(),
            info,
            warnings,
        })
    }

    /// Add a month to the history. Returns the month label, or `None` when
    /// a file of that name is already on file.
    pub fn upload_history(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<Option<String>, LoadError> {
        if self.state.has_history_file(file_name) {
            info!("history file {file_name} already loaded, skipping");
            return Ok(None);
        }
        loader::validate_upload(file_name, bytes.len(), self.max_upload_bytes)?;
        let tables = loader::load_workbook_bytes(bytes)?;

        let month = loader::extract_month_label(file_name, &tables);
        self.state.add_history(
            &month,
            HistoryEntry {
                month: month.clone(),
                file_name: file_name.to_string(),
                sales: tables.sales,
                department_sales: tables.department_sales,
            },
        );
        info!("history month {month} from {file_name}");
        Ok(Some(month))
    }

    pub fn remove_history(&mut self, month: &str) -> Option<HistoryEntry> {
        self.state.remove_history(month)
    }

    pub fn clear_history(&mut self) {
        self.state.clear_history();
    }

    pub fn navigate(&mut self, key: &str) -> Result<Page, NavError> {
        self.pages.navigate_to(key, &self.state)
    }

    pub fn back(&mut self) -> Result<Page, NavError> {
        self.pages.go_back(&self.state)
    }

    pub fn home(&mut self) -> Result<Page, NavError> {
        self.pages.go_home(&self.state)
    }

    pub fn undo(&mut self) -> Result<Undone, NavError> {
        self.pages.undo_last_action(&mut self.state)
    }

    /// Drop the current tables and return home. History is kept.
    pub fn clear(&mut self) -> Result<Page, NavError> {
        self.state.clear_all();
        info!("cleared current data");
        self.pages.go_home(&self.state)
    }

    /// Render the current page.
    ///
    /// When the page cannot be rendered the session moves home, so later
    /// requests and the undo log see home as the current page.
    ///
    /// # Arguments
    /// * `request` - Entity selections for the trend pages
    ///
    /// # Returns
    /// The rendered page, with `error` set when home is shown instead
    pub fn render_current(&mut self, request: &RenderRequest) -> Rendered {
        let page = self.pages.current();
        match views::render(page, &self.state, request) {
            Ok(view) => self.frame(page, view, None),
            Err(e) => {
                warn!("rendering {page} failed: {e}");
                if let Err(nav) = self.pages.go_home(&self.state) {
                    warn!("cannot return home: {nav}");
                }
                let view = PageView::Home(views::home(&self.state));
                self.frame(Page::Home, view, Some(e.to_string()))
            }
        }
    }

    fn frame(&self, page: Page, view: PageView, error: Option<String>) -> Rendered {
        Rendered {
            page,
            title: page.config().title,
            breadcrumb: page.breadcrumb(),
            nav: Page::nav_pages(),
            can_undo: self.pages.can_undo(),
            error,
            view,
        }
    }

    /// Trend table for download. `names` is ignored for the overall trend.
    pub fn trend(&self, kind: TrendKind, names: &[String]) -> Result<TrendTable, TrendError> {
        let history = self.state.history();
        trends::ensure_comparable(history)?;
        match kind {
            TrendKind::Overall => Ok(trends::overall_trend(history)),
            TrendKind::Employee => trends::employee_trend(history, names),
            TrendKind::Department => trends::department_trend(history, names),
        }
    }
}

fn sheet_warnings(tables: &TableSet) -> Vec<String> {
    TableKind::ALL
        .into_iter()
        .filter(|k| tables.get(*k).is_some())
        .filter_map(|k| loader::validate(k, tables.get(k)).err())
        .map(|e| e.to_string())
        .collect()
}
