use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path as UrlPath, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use ulid::Ulid;

use crate::engine::{Engine, parse_timestamp};
use crate::error::CoreError;
use crate::model::AppointmentPayload;
use crate::session::SessionAuthority;

/// Name of the opaque session cookie set on login and cleared on logout.
pub const SESSION_COOKIE: &str = "mowbook_session";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<SessionAuthority>,
}

/// The JSON API under `/api`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/api/appointments/{id}",
            put(update_appointment).delete(delete_appointment),
        )
        .route("/api/admin/me", get(admin_me))
        .route("/api/admin/login", post(admin_login))
        .route("/api/admin/logout", post(admin_logout))
        .route("/api/admin/password", post(admin_change_password))
        .with_state(state)
}

/// Full application: the API plus the booking widget's static assets, with
/// SPA-style fallback to `index.html` and a dedicated `/admin` page.
pub fn app(state: AppState, public_dir: &Path) -> Router {
    let spa = ServeDir::new(public_dir)
        .not_found_service(ServeFile::new(public_dir.join("index.html")));
    api_router(state)
        .route_service("/admin", ServeFile::new(public_dir.join("admin.html")))
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
}

// ── Error mapping ────────────────────────────────────────────────

/// Boundary wrapper turning a [`CoreError`] into a stable JSON error body.
/// Internal detail (paths, io errors) stays in the log.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::SlotUnavailable(_) => StatusCode::CONFLICT,
            CoreError::InvalidCredentials | CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self.0 {
            CoreError::SlotUnavailable(_) => {
                "this appointment slot is no longer available".to_string()
            }
            CoreError::NotFound(_) => "appointment not found".to_string(),
            CoreError::Storage(e) => {
                tracing::error!("storage failure: {e}");
                "a storage failure prevented the operation".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(json!({ "error": self.0.kind(), "message": message })),
        )
            .into_response()
    }
}

// ── Session plumbing ─────────────────────────────────────────────

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .map(str::to_string)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = session_token(headers);
    if state.sessions.is_authenticated(token.as_deref()) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized.into())
    }
}

fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}

/// A `PUT`/`DELETE` id that doesn't parse cannot name any record.
fn parse_id(raw: &str) -> Result<Ulid, ApiError> {
    Ulid::from_string(raw).map_err(|_| CoreError::NotFound(Ulid::nil()).into())
}

// ── Appointment handlers ─────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

/// Unparseable range bounds are ignored — listing has no failure mode.
fn parse_bound(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    parse_timestamp(raw).ok()
}

async fn list_appointments(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> impl IntoResponse {
    let appointments = state
        .engine
        .list(parse_bound(range.start), parse_bound(range.end))
        .await;
    Json(json!({ "appointments": appointments }))
}

async fn create_appointment(
    State(state): State<AppState>,
    Json(payload): Json<AppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = state.engine.create(&payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "appointment": appointment })),
    ))
}

async fn update_appointment(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    Json(payload): Json<AppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    let id = parse_id(&id)?;
    let appointment = state.engine.update(id, &payload).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

async fn delete_appointment(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    state.engine.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Admin handlers ───────────────────────────────────────────────

async fn admin_me(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let token = session_token(&headers);
    let authenticated = state.sessions.is_authenticated(token.as_deref());
    Json(json!({ "authenticated": authenticated }))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginRequest {
    password: Option<String>,
}

async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .sessions
        .login(req.password.as_deref().unwrap_or(""))
        .await?;
    let cookie = session_cookie(&token, state.sessions.ttl().as_secs());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "authenticated": true })),
    ))
}

async fn admin_logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    state.sessions.logout(session_token(&headers).as_deref());
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    )
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

async fn admin_change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token(&headers);
    state
        .sessions
        .change_password(
            token.as_deref(),
            req.current_password.as_deref().unwrap_or(""),
            req.new_password.as_deref().unwrap_or(""),
        )
        .await?;
    Ok(Json(json!({ "success": true })))
}
