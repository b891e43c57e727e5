use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use handlebars::Handlebars;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::dataset::Workbook;
use crate::downloader::{self, CSV_FILENAME, XLSX_FILENAME, XLSX_MIME};
use crate::error::ExplorerError;
use crate::login::{self, SessionId};
use crate::pipeline::{self, FilterParams, View};
use crate::session::SessionStore;
use crate::source::SourceCache;

/// Shared application state: read-only configuration, the workbook cache
/// and the per-operator sessions.
pub struct AppState {
    pub config: Config,
    pub cache: SourceCache,
    pub sessions: SessionStore,
    pub templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ExplorerError> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string("login", include_str!("./static/login.hbs"))
            .map_err(Box::new)?;
        templates
            .register_template_string("explore", include_str!("./static/explore.hbs"))
            .map_err(Box::new)?;

        let lifetime = config.session_lifetime()?;

        Ok(AppState {
            config,
            cache: SourceCache::new(),
            sessions: SessionStore::new(lifetime),
            templates,
        })
    }

    async fn workbook(&self) -> Result<Arc<Workbook>, ApiError> {
        Ok(self.cache.get_or_load(&self.config).await?)
    }
}

/// Error returned from API handlers
pub enum ApiError {
    Explorer(ExplorerError),
    SessionExpired,
}

impl From<ExplorerError> for ApiError {
    fn from(e: ExplorerError) -> Self {
        ApiError::Explorer(e)
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ApiError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired".to_string()),
            ApiError::Explorer(e) => {
                let code = match &e {
                    ExplorerError::UnknownColumn(_)
                    | ExplorerError::NotSupportColumn(_)
                    | ExplorerError::NotConfigured(_) => StatusCode::BAD_REQUEST,
                    ExplorerError::Fetch { .. }
                    | ExplorerError::Workbook(_)
                    | ExplorerError::Csv(_)
                    | ExplorerError::MissingSheet(_)
                    | ExplorerError::EmptySheet(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if code != StatusCode::BAD_REQUEST {
                    error!("request failed: {}", e);
                }
                (code, e.to_string())
            }
        };

        (
            code,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(message),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct ColumnsQuery {
    search: Option<String>,
}

#[derive(Deserialize)]
struct ValuesQuery {
    column: String,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

#[derive(Serialize)]
struct ColumnsResponse {
    columns: Vec<String>,
    mandatory: Vec<String>,
    support: Vec<String>,
    geographic: Option<String>,
    sentinels: Vec<String>,
    optional: Vec<String>,
    offered: Vec<String>,
}

#[derive(Serialize)]
struct ValuesResponse {
    column: String,
    values: Vec<crate::cell::CellValue>,
}

#[derive(Serialize)]
struct ViewResponse<'a> {
    records: usize,
    view: View,
    auxiliary: Vec<pipeline::AuxiliaryTable<'a>>,
}

/// Build the application router
///
/// Everything except the login endpoints sits behind
/// [`login::require_auth`].
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/explore", get(serve_explorer))
        .route("/api/columns", get(get_columns))
        .route("/api/values", get(get_values))
        .route("/api/filters", get(get_filters).post(update_filters))
        .route("/api/view", get(get_view))
        .route("/api/export", get(export_view))
        .route("/api/refresh", post(refresh_source))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            login::require_auth,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::to("/explore") }))
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", post(login::handle_logout))
        .merge(protected)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .with_state(state)
}

/// Start the web server
///
/// Loads the survey source before binding; a source that cannot be fetched
/// or parsed stops startup.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.password_hash.is_none() {
        return Err(ExplorerError::NotConfigured("password_hash").into());
    }

    let state = Arc::new(AppState::new(config)?);
    let workbook = state.cache.get_or_load(&state.config).await?;
    info!(
        "source ready: {} records, auxiliary sheets {:?}",
        workbook.primary.len(),
        workbook.auxiliary.keys().collect::<Vec<_>>()
    );

    let listener = TcpListener::bind(&state.config.bind).await?;
    info!("listening on http://{}", state.config.bind);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn session_params(state: &AppState, session: &SessionId) -> Result<FilterParams, ApiError> {
    state
        .sessions
        .params(&session.0)
        .await
        .ok_or(ApiError::SessionExpired)
}

fn evaluate(state: &AppState, workbook: &Workbook, params: &FilterParams) -> Result<View, ApiError> {
    Ok(pipeline::evaluate(
        &workbook.primary,
        &state.config.roles(),
        params,
        &state.config.auxiliary_sheets,
        state.config.unknown_columns,
    )?)
}

async fn serve_explorer(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let workbook = state.workbook().await?;
    let data = serde_json::json!({
        "records": workbook.primary.len(),
        "columns": workbook.primary.columns.len(),
        "source": state.config.source,
    });

    Ok(match state.templates.render("explore", &data) {
        Ok(page) => Html(page).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    })
}

async fn get_columns(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ColumnsQuery>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    let workbook = state.workbook().await?;
    let dataset = &workbook.primary;
    let roles = state.config.roles();

    let search = match query.search {
        Some(term) => term,
        None => session_params(&state, &session).await?.search,
    };

    Ok(Json(ColumnsResponse {
        columns: dataset.columns.clone(),
        mandatory: pipeline::emitted_columns(dataset, &roles, &[]),
        support: roles.support.clone(),
        geographic: roles.geographic.clone(),
        sentinels: state.config.auxiliary_sheets.keys().cloned().collect(),
        optional: pipeline::optional_columns(dataset, &roles),
        offered: pipeline::offered_columns(dataset, &roles, &search),
    }))
}

async fn get_values(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ValuesQuery>,
) -> Result<Json<ValuesResponse>, ApiError> {
    let workbook = state.workbook().await?;
    let values = workbook.primary.unique_values(&query.column)?;

    Ok(Json(ValuesResponse {
        column: query.column,
        values,
    }))
}

async fn get_filters(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<FilterParams>, ApiError> {
    Ok(Json(session_params(&state, &session).await?))
}

/// Replace the session's filters. Parameters that do not evaluate are
/// rejected and the previous ones stay in place.
async fn update_filters(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Json(params): Json<FilterParams>,
) -> Result<Response, ApiError> {
    let workbook = state.workbook().await?;
    let view = evaluate(&state, &workbook, &params)?;

    if !state.sessions.set_params(&session.0, params).await {
        return Err(ApiError::SessionExpired);
    }

    Ok(Json(serde_json::json!({ "status": "ok", "records": view.len() })).into_response())
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Result<Response, ApiError> {
    let params = session_params(&state, &session).await?;
    let workbook = state.workbook().await?;
    let view = evaluate(&state, &workbook, &params)?;
    let auxiliary =
        pipeline::auxiliary_tables(&workbook, &params, &state.config.auxiliary_sheets);

    Ok(Json(ViewResponse {
        records: view.len(),
        view,
        auxiliary,
    })
    .into_response())
}

async fn export_view(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let params = session_params(&state, &session).await?;
    let workbook = state.workbook().await?;
    let view = evaluate(&state, &workbook, &params)?;

    let (body, mime, filename) = match query.format.as_deref() {
        Some("csv") => (
            downloader::to_csv(&view)?.into_bytes(),
            "text/csv; charset=utf-8",
            CSV_FILENAME,
        ),
        _ => (downloader::to_xlsx(&view)?, XLSX_MIME, XLSX_FILENAME),
    };
    info!("exporting {} records as {}", view.len(), filename);

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

/// Drop the cached workbook and load it again.
async fn refresh_source(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    state.cache.invalidate(&state.config.source).await;
    let workbook = state.cache.get_or_load(&state.config).await.map_err(|e| {
        warn!("reload of {} failed: {}", state.config.source, e);
        e
    })?;

    Ok(Json(serde_json::json!({ "status": "ok", "records": workbook.primary.len() })).into_response())
}
