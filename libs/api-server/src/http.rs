use std::sync::LazyLock;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use regex::Regex;

use user_api::UserRecord;

use crate::{ApiError, AppState};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Проверка кандидата перед Create/Update: непустое имя и email вида
/// `local@domain.tld`. Registry сам ничего не валидирует.
pub fn validate_user(user: &UserRecord) -> Result<(), ApiError> {
    if user.name.is_empty() {
        return Err(ApiError::Validation("name"));
    }
    if !EMAIL_RE.is_match(&user.email) {
        return Err(ApiError::Validation("email"));
    }
    Ok(())
}

fn parse_user(body: &[u8]) -> Result<UserRecord, ApiError> {
    let user: UserRecord = serde_json::from_slice(body).map_err(ApiError::BadJson)?;
    validate_user(&user)?;
    Ok(user)
}

// Нечисловой id ведёт себя как неизвестный: 0 registry не выдаёт.
fn parse_id(raw: &str) -> u64 {
    raw.parse().unwrap_or(0)
}

// ═══════════════════════════════════════════════════════════════
//  GET /health
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ═══════════════════════════════════════════════════════════════
//  /api/users
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_list(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.list())
}

pub(crate) async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    Ok(Json(state.registry.get(parse_id(&id))?))
}

pub(crate) async fn handle_create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let candidate = parse_user(&body)?;
    let saved = state.registry.create(candidate);

    state.audit.submit("CREATE", saved.id);
    state.notify.submit("created", saved.id);

    Ok((StatusCode::CREATED, Json(saved)))
}

pub(crate) async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<UserRecord>, ApiError> {
    let candidate = parse_user(&body)?;
    let updated = state.registry.update(parse_id(&id), candidate)?;

    state.audit.submit("UPDATE", updated.id);
    state.notify.submit("updated", updated.id);

    Ok(Json(updated))
}

pub(crate) async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id);
    state.registry.delete(id)?;

    state.audit.submit("DELETE", id);
    state.notify.submit("deleted", id);

    Ok(StatusCode::NO_CONTENT)
}
