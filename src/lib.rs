/*!
# Sales Board

A browser-backed dashboard for monthly sales, collections and employee
scoring data, built in Rust.

## Overview

Each month the sales team exports one workbook (`员工销售回款统计_YYYY年M月.xlsx`)
with up to four sheets: employee scores, employee sales and collections,
department sales and collections, and a ranking sheet. The dashboard loads
that workbook, ranks teams into a red list and a black list, summarises sales
and collections, and compares uploaded months against each other.

## Architecture

### Frontend Layer
- **Technologies**: HTML, JavaScript
- Draws the JSON page views returned by the API. Chart rendering lives
  entirely in the browser.

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Data Loader - Sheet detection, per-sheet validation, team ranking
  - State Store - Per-session tables, file name and month history
  - Page Manager - Fixed page tree, back stack and a bounded undo log
  - Trend Aggregation - Month ordering and month-over-month growth rates
  - Page Renderers - One pure function per page producing a serializable view
  - Export - CSV and XLSX downloads of trend tables

Nothing is persisted: every session lives in memory until it goes idle.

## Modules

- **table**: Cell values, tables and the four sheet kinds
- **records**: Typed rows and the export's column names
- **loader**: Workbook loading, validation, leaderboard and month labels
- **state**: Per-session state store and history
- **pages**: Page identifiers and their static metadata
- **navigation**: Back stack and undo log
- **trends**: Historical comparison
- **rankings**: Weekly, monthly and overdue rankings
- **sales**: Sales sheet overview, weekly totals and badges
- **views**: Page renderers
- **downloader**: Export functionality (CSV, XLSX)
- **session**: The per-user session tying all of the above together
- **config**: Server settings
- **error**: Error types
- **app**: Routing and session cookies (feature `web`)

## REST API Endpoints

- `GET /api/page` - Render the current page
- `GET /api/summary` - Counts of loaded data
- `POST /api/upload` - Replace current data with an uploaded workbook
- `POST /api/history` - Add one or more months for comparison
- `DELETE /api/history/{month}`, `POST /api/history/clear` - Drop history
- `POST /api/clear` - Drop current data
- `POST /api/navigate/{page}`, `/api/back`, `/api/home`, `/api/undo` - Navigation
- `GET /api/trends/{overall,employees,departments}` - Trend data as JSON, CSV or XLSX
*/

pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod navigation;
pub mod pages;
pub mod rankings;
pub mod records;
pub mod sales;
pub mod session;
pub mod state;
pub mod table;
pub mod trends;
pub mod views;

#[cfg(feature = "web")]
pub mod app;

pub use error::*;
pub use navigation::PageManager;
pub use pages::Page;
pub use session::Session;
pub use state::StateStore;
pub use table::{Table, TableKind, TableSet, Value};
