use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::downloader::{self, ExportFormat};
use crate::error::{LoadError, NavError};
use crate::loader;
use crate::session::Session;
use crate::trends::TrendKind;
use crate::views::{RenderRequest, parse_names};

const SESSION_COOKIE: &str = "salesboard_session";
/// Sessions idle for longer than this are dropped.
const SESSION_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

type SharedSession = Arc<Mutex<Session>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Live sessions by cookie id. The registry lock is held only to look up or
/// create an entry; work on a session holds that session's own lock.
#[derive(Default)]
struct SessionRegistry {
    entries: HashMap<String, SessionEntry>,
}

impl SessionRegistry {
    /// Drop idle sessions, then return the caller's session and its id.
    ///
    /// An id that is missing, expired or unknown gets a fresh session under a
    /// new id; the flag tells the caller to set the cookie.
    fn checkout(
        &mut self,
        id: Option<&str>,
        now: Instant,
        make: impl FnOnce() -> Session,
    ) -> (String, SharedSession, bool) {
        self.entries
            .retain(|_, e| now.duration_since(e.last_seen) < SESSION_IDLE);

        if let Some(id) = id {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.last_seen = now;
                return (id.to_string(), Arc::clone(&entry.session), false);
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(make()));
        self.entries.insert(
            id.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        (id, session, true)
    }
}

lazy_static! {
    static ref SESSIONS: Mutex<SessionRegistry> = Mutex::new(SessionRegistry::default());
}

pub struct AppState {
    max_upload_bytes: usize,
    /// Workbook every new session starts with.
    preload: Option<PathBuf>,
}

impl AppState {
    fn new_session(&self) -> Session {
        let mut session = Session::new(self.max_upload_bytes);
        if let Some(path) = &self.preload {
            if let Err(e) = session.preload(path) {
                warn!("could not preload {}: {}", path.display(), e);
            }
        }
        session
    }
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

#[derive(Deserialize, Default)]
struct PageQuery {
    employees: Option<String>,
    departments: Option<String>,
    employee: Option<String>,
}

impl PageQuery {
    fn request(&self) -> RenderRequest {
        RenderRequest {
            employees: self.employees.as_deref().map(parse_names),
            departments: self.departments.as_deref().map(parse_names),
            employee: self.employee.clone(),
        }
    }
}

#[derive(Deserialize)]
struct TrendQuery {
    names: Option<String>,
    format: Option<String>,
}

#[derive(Serialize)]
struct HistoryUpload {
    file_name: String,
    month: Option<String>,
    skipped: bool,
    error: Option<String>,
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let preload = match &config.data_dir {
        Some(dir) => match loader::auto_detect(dir) {
            Ok(found) => found,
            Err(e) => {
                warn!("cannot scan {}: {}", dir.display(), e);
                None
            }
        },
        None => None,
    };
    if let Some(path) = &preload {
        info!("new sessions start with {}", path.display());
    }

    let app_state = Arc::new(AppState {
        max_upload_bytes: config.max_upload_bytes,
        preload,
    });

    let mut app = Router::new()
        .route("/api/page", get(get_page))
        .route("/api/summary", get(get_summary))
        .route("/api/upload", post(upload))
        .route("/api/history", post(upload_history))
        .route("/api/history/clear", post(clear_history))
        .route("/api/history/:month", delete(remove_history))
        .route("/api/clear", post(clear_data))
        .route("/api/navigate/:page", post(navigate))
        .route("/api/back", post(go_back))
        .route("/api/home", post(go_home))
        .route("/api/undo", post(undo))
        .route("/api/trends/:kind", get(export_trend))
        // Multipart framing needs a little room above the file limit.
        .layer(DefaultBodyLimit::max(config.max_upload_bytes + 64 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// The caller's session, creating one (and its cookie) when the request
/// carries no live session id.
fn session_for(jar: CookieJar, app: &AppState) -> (CookieJar, SharedSession) {
    let cookie_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (id, session, created) = SESSIONS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .checkout(cookie_id.as_deref(), Instant::now(), || app.new_session());

    if !created {
        return (jar, session);
    }
    let mut cookie = Cookie::new(SESSION_COOKIE, id);
    cookie.set_path("/");
    cookie.set_http_only(true);
    (jar.add(cookie), session)
}

/// Run `f` on the caller's session, holding only that session's lock.
fn with_session<T>(jar: CookieJar, app: &AppState, f: impl FnOnce(&mut Session) -> T) -> (CookieJar, T) {
    let (jar, session) = session_for(jar, app);
    let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
    let result = f(&mut session);
    (jar, result)
}

/// Like [`with_session`], for workbook parsing: `f` runs on the blocking pool
/// so the async workers stay free.
async fn with_session_blocking<T, F>(jar: CookieJar, app: &AppState, f: F) -> (CookieJar, Result<T, Response>)
where
    T: Send + 'static,
    F: FnOnce(&mut Session) -> T + Send + 'static,
{
    let (jar, session) = session_for(jar, app);
    let result = tokio::task::spawn_blocking(move || {
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    })
    .await
    .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e));
    (jar, result)
}

fn ok<T: Serialize>(message: Option<String>, data: T) -> Response {
    Json(ApiResponse {
        status: "ok",
        message,
        data: Some(data),
    })
    .into_response()
}

fn fail(code: StatusCode, message: impl ToString) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        status: "error",
        message: Some(message.to_string()),
        data: None,
    };
    (code, Json(body)).into_response()
}

fn nav_status(e: &NavError) -> StatusCode {
    match e {
        NavError::UnknownPage(_) => StatusCode::NOT_FOUND,
        NavError::MissingData { .. } | NavError::NothingToUndo => StatusCode::CONFLICT,
    }
}

fn load_status(e: &LoadError) -> StatusCode {
    match e {
        LoadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        LoadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

async fn get_page(
    jar: CookieJar,
    State(app): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let request = query.request();
    let (jar, rendered) = with_session(jar, &app, |s| s.render_current(&request));
    (jar, ok(None, rendered))
}

async fn get_summary(jar: CookieJar, State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, summary) = with_session(jar, &app, |s| s.summary());
    (jar, ok(None, summary))
}

/// Every `file` part of a multipart body as (file name, bytes).
async fn file_parts(mut multipart: Multipart) -> Result<Vec<(String, Vec<u8>)>, Response> {
    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(fail(StatusCode::BAD_REQUEST, e)),
        };
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => files.push((file_name, bytes.to_vec())),
            Err(e) => return Err(fail(StatusCode::BAD_REQUEST, e)),
        }
    }
    Ok(files)
}

async fn upload(jar: CookieJar, State(app): State<Arc<AppState>>, multipart: Multipart) -> impl IntoResponse {
    let files = match file_parts(multipart).await {
        Ok(files) => files,
        Err(response) => return (jar, response),
    };
    let Some((file_name, bytes)) = files.into_iter().next() else {
        return (jar, fail(StatusCode::BAD_REQUEST, LoadError::NoFile));
    };

    let name = file_name.clone();
    let (jar, result) = with_session_blocking(jar, &app, move |s| s.upload(&name, bytes)).await;
    let result = match result {
        Ok(result) => result,
        Err(response) => return (jar, response),
    };
    match result {
        Ok(outcome) => (jar, ok(Some(format!("成功加载数据文件: {file_name}")), outcome)),
        Err(e) => {
            warn!("upload of {file_name} failed: {e}");
            (jar, fail(load_status(&e), e))
        }
    }
}

async fn upload_history(
    jar: CookieJar,
    State(app): State<Arc<AppState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let files = match file_parts(multipart).await {
        Ok(files) => files,
        Err(response) => return (jar, response),
    };
    if files.is_empty() {
        return (jar, fail(StatusCode::BAD_REQUEST, LoadError::NoFile));
    }

    let (jar, results) = with_session_blocking(jar, &app, move |s| {
        files
            .into_iter()
            .map(|(file_name, bytes)| match s.upload_history(&file_name, bytes) {
                Ok(month) => HistoryUpload {
                    skipped: month.is_none(),
                    file_name,
                    month,
                    error: None,
                },
                Err(e) => HistoryUpload {
                    file_name,
                    month: None,
                    skipped: false,
                    error: Some(e.to_string()),
                },
            })
            .collect::<Vec<_>>()
    })
    .await;
    match results {
        Ok(results) => (jar, ok(None, results)),
        Err(response) => (jar, response),
    }
}

async fn remove_history(
    jar: CookieJar,
    State(app): State<Arc<AppState>>,
    Path(month): Path<String>,
) -> impl IntoResponse {
    let (jar, removed) = with_session(jar, &app, |s| s.remove_history(&month));
    match removed {
        Some(entry) => (jar, ok(Some(format!("已删除 {month} 的历史数据")), entry.file_name)),
        None => (jar, fail(StatusCode::NOT_FOUND, format!("没有 {month} 的历史数据"))),
    }
}

async fn clear_history(jar: CookieJar, State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, summary) = with_session(jar, &app, |s| {
        s.clear_history();
        s.summary()
    });
    (jar, ok(Some("已清空历史数据".to_string()), summary))
}

async fn clear_data(jar: CookieJar, State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, result) = with_session(jar, &app, |s| {
        s.clear()
            .map(|_| s.render_current(&RenderRequest::default()))
    });
    match result {
        Ok(rendered) => (jar, ok(Some("已清除当前数据".to_string()), rendered)),
        Err(e) => (jar, fail(nav_status(&e), e)),
    }
}

async fn navigate(
    jar: CookieJar,
    State(app): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> impl IntoResponse {
    let (jar, result) = with_session(jar, &app, |s| {
        s.navigate(&page)
            .map(|_| s.render_current(&RenderRequest::default()))
    });
    match result {
        Ok(rendered) => (jar, ok(None, rendered)),
        Err(e) => (jar, fail(nav_status(&e), e)),
    }
}

async fn go_back(jar: CookieJar, State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, result) = with_session(jar, &app, |s| {
        s.back().map(|_| s.render_current(&RenderRequest::default()))
    });
    match result {
        Ok(rendered) => (jar, ok(None, rendered)),
        Err(e) => (jar, fail(nav_status(&e), e)),
    }
}

async fn go_home(jar: CookieJar, State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, result) = with_session(jar, &app, |s| {
        s.home().map(|_| s.render_current(&RenderRequest::default()))
    });
    match result {
        Ok(rendered) => (jar, ok(None, rendered)),
        Err(e) => (jar, fail(nav_status(&e), e)),
    }
}

async fn undo(jar: CookieJar, State(app): State<Arc<AppState>>) -> impl IntoResponse {
    let (jar, result) = with_session(jar, &app, |s| {
        s.undo()
            .map(|undone| (undone, s.render_current(&RenderRequest::default())))
    });
    match result {
        Ok((undone, rendered)) => (jar, ok(Some(undone.to_string()), rendered)),
        Err(e) => (jar, fail(nav_status(&e), e)),
    }
}

async fn export_trend(
    jar: CookieJar,
    State(app): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<TrendQuery>,
) -> impl IntoResponse {
    let kind = match kind.as_str() {
        "overall" => TrendKind::Overall,
        "employees" => TrendKind::Employee,
        "departments" => TrendKind::Department,
        other => return (jar, fail(StatusCode::NOT_FOUND, format!("未知的趋势类型: {other}"))),
    };
    let format = match query.format.as_deref() {
        None | Some("json") => None,
        Some(name) => match ExportFormat::from_name(name) {
            Some(format) => Some(format),
            None => return (jar, fail(StatusCode::BAD_REQUEST, format!("不支持的导出格式: {name}"))),
        },
    };
    let names = query.names.as_deref().map(parse_names).unwrap_or_default();

    let (jar, result) = with_session(jar, &app, |s| s.trend(kind, &names));
    let trend = match result {
        Ok(trend) => trend,
        Err(e) => return (jar, fail(StatusCode::CONFLICT, e)),
    };

    let Some(format) = format else {
        return (jar, ok(None, trend));
    };
    match downloader::export(&trend, format) {
        Ok(bytes) => {
            let file_name = downloader::export_file_name(kind, format);
            let disposition = format!("attachment; filename*=UTF-8''{}", urlencoding::encode(&file_name));
            let headers = [
                (header::CONTENT_TYPE, format.content_type().to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ];
            (jar, (headers, bytes).into_response())
        }
        Err(e) => (jar, fail(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}
