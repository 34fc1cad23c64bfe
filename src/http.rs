use crate::errors::{AppError, AppResult};
use crate::models::{AppDescriptor, KanbanTask, NotePayload, NoteRecord, TableSummary, TaskPayload};
use crate::registry::AppRegistry;
use crate::store::Stores;
use axum::body::{Body, Bytes};
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Handles shared by every request.
#[derive(Clone)]
pub struct HubState {
    pub registry: Arc<AppRegistry>,
    pub stores: Option<Stores>,
    pub static_dir: PathBuf,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::Malformed(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

pub fn router(state: HubState) -> Router {
    Router::new()
        .route("/", get(hub_index))
        .route("/style.css", get(hub_style))
        .route("/script.js", get(hub_script))
        .route("/api/apps", get(list_apps))
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/", get(list_notes).post(create_note))
        .route("/api/notes/:id", get(get_note).put(update_note).delete(delete_note))
        .route("/api/kanban", get(list_tasks).post(create_task))
        .route("/api/kanban/:id", put(update_task).delete(delete_task))
        .route("/api/database/tables", get(list_tables))
        .route("/api/database/tables/:table", get(table_rows))
        .route("/app/:name", get(visit_app))
        .route("/app/:name/", get(visit_app))
        .route("/app/:name/*path", get(app_asset))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Content type for an asset by extension; `None` leaves the header unset.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "css" => "text/css",
        "js" => "application/javascript",
        "html" => "text/html",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(content_type)
}

/// Runs filesystem and store work on the blocking pool.
async fn blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| AppError::Internal(format!("blocking task failed: {}", error)))?
}

async fn list_apps(State(state): State<HubState>) -> AppResult<Json<Vec<AppDescriptor>>> {
    let registry = Arc::clone(&state.registry);
    let apps = blocking(move || {
        registry.rescan()?;
        registry.list()
    })
    .await?;
    Ok(Json(apps))
}

async fn visit_app(State(state): State<HubState>, UrlPath(name): UrlPath<String>) -> AppResult<Response> {
    let registry = Arc::clone(&state.registry);
    let document = blocking(move || {
        registry.record_visit(&name)?;
        registry.resolve(&name)
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, HeaderValue::from_static("text/html"))], document).into_response())
}

async fn app_asset(
    State(state): State<HubState>,
    UrlPath((name, relative)): UrlPath<(String, String)>,
) -> AppResult<Response> {
    let registry = Arc::clone(&state.registry);
    let path = blocking(move || registry.static_asset(&name, relative.trim_start_matches('/'))).await?;
    file_response(&path).await
}

async fn hub_index(State(state): State<HubState>) -> AppResult<Response> {
    file_response(&state.static_dir.join("index.html")).await
}

async fn hub_style(State(state): State<HubState>) -> AppResult<Response> {
    file_response(&state.static_dir.join("style.css")).await
}

async fn hub_script(State(state): State<HubState>) -> AppResult<Response> {
    file_response(&state.static_dir.join("script.js")).await
}

async fn file_response(path: &Path) -> AppResult<Response> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| AppError::NotFound(format!("file '{}' not found", display_name(path))))?;

    let mut response = Response::new(Body::from(bytes));
    if let Some(content_type) = content_type_for(path) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    Ok(response)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn stores(state: &HubState) -> AppResult<Stores> {
    state
        .stores
        .clone()
        .ok_or_else(|| AppError::Unavailable("Notes database not available".to_string()))
}

fn parse_id(raw: &str, message: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Malformed(message.to_string()))
}

fn parse_note_payload(body: &[u8]) -> AppResult<(String, String)> {
    serde_json::from_slice::<NotePayload>(body)
        .map(NotePayload::into_parts)
        .map_err(|_| AppError::Malformed("Invalid JSON".to_string()))
}

fn parse_task_payload(body: &[u8]) -> AppResult<TaskPayload> {
    serde_json::from_slice::<TaskPayload>(body).map_err(|_| AppError::Malformed("Invalid JSON".to_string()))
}

async fn list_notes(State(state): State<HubState>) -> AppResult<Json<Vec<NoteRecord>>> {
    let notes = stores(&state)?.notes;
    Ok(Json(blocking(move || notes.get_all()).await?))
}

async fn create_note(State(state): State<HubState>, body: Bytes) -> AppResult<(StatusCode, Json<NoteRecord>)> {
    let notes = stores(&state)?.notes;
    let (title, content) = parse_note_payload(&body)?;
    let note = blocking(move || notes.create(&title, &content)).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(State(state): State<HubState>, UrlPath(raw_id): UrlPath<String>) -> AppResult<Json<NoteRecord>> {
    let notes = stores(&state)?.notes;
    let id = parse_id(&raw_id, "Invalid note ID")?;
    Ok(Json(blocking(move || notes.get_by_id(id)).await?))
}

async fn update_note(
    State(state): State<HubState>,
    UrlPath(raw_id): UrlPath<String>,
    body: Bytes,
) -> AppResult<Json<NoteRecord>> {
    let notes = stores(&state)?.notes;
    let id = parse_id(&raw_id, "Invalid note ID")?;
    let (title, content) = parse_note_payload(&body)?;
    Ok(Json(blocking(move || notes.update(id, &title, &content)).await?))
}

async fn delete_note(State(state): State<HubState>, UrlPath(raw_id): UrlPath<String>) -> AppResult<StatusCode> {
    let notes = stores(&state)?.notes;
    let id = parse_id(&raw_id, "Invalid note ID")?;
    blocking(move || notes.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tasks(State(state): State<HubState>) -> AppResult<Json<Vec<KanbanTask>>> {
    let tasks = stores(&state)?.tasks;
    Ok(Json(blocking(move || tasks.get_all()).await?))
}

async fn create_task(State(state): State<HubState>, body: Bytes) -> AppResult<(StatusCode, Json<KanbanTask>)> {
    let tasks = stores(&state)?.tasks;
    let draft = parse_task_payload(&body)?.into_draft();
    let task = blocking(move || tasks.create(&draft)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<HubState>,
    UrlPath(raw_id): UrlPath<String>,
    body: Bytes,
) -> AppResult<Json<KanbanTask>> {
    let tasks = stores(&state)?.tasks;
    let id = parse_id(&raw_id, "Invalid task ID")?;
    let draft = parse_task_payload(&body)?.into_draft();
    Ok(Json(blocking(move || tasks.update(id, &draft)).await?))
}

async fn delete_task(State(state): State<HubState>, UrlPath(raw_id): UrlPath<String>) -> AppResult<Json<Value>> {
    let tasks = stores(&state)?.tasks;
    let id = parse_id(&raw_id, "Invalid task ID")?;
    blocking(move || tasks.delete(id)).await?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

async fn list_tables(State(state): State<HubState>) -> AppResult<Json<Vec<TableSummary>>> {
    let stores = stores(&state)?;
    Ok(Json(blocking(move || stores.tables()).await?))
}

async fn table_rows(State(state): State<HubState>, UrlPath(table): UrlPath<String>) -> AppResult<Json<Vec<Value>>> {
    let stores = stores(&state)?;
    Ok(Json(blocking(move || stores.table_rows(&table)).await?))
}
