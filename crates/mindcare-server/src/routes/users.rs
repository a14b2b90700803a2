use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mindcare_core::directory::{self, BootstrapOutcome};
use mindcare_core::policy::Actor;
use mindcare_core::types::Role;
use mindcare_core::user::User;
use serde::Deserialize;
use uuid::Uuid;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// POST /api/users — the identity provider registers an account on first
/// sign-in. Needs no caller, only the bearer token when one is configured.
pub async fn register_user(
    State(app): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if body.name.is_none() && body.email.is_none() {
        return Err(AppError::bad_request("a name or an email is required"));
    }
    let store = app.store.clone();
    let user = blocking(move || directory::register_user(&store, body.name, body.email)).await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/me
pub async fn me(CurrentActor(actor): CurrentActor) -> Json<Actor> {
    Json(actor)
}

/// POST /api/users/bootstrap — assign institution and starting role.
pub async fn bootstrap(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<BootstrapOutcome>, AppError> {
    let (store, config) = (app.store.clone(), app.config.clone());
    let outcome = blocking(move || directory::ensure_initial_roles(&store, &config, &actor)).await?;
    if outcome.changed {
        app.notify();
    }
    Ok(Json(outcome))
}

/// GET /api/users
pub async fn list_users(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<User>>, AppError> {
    let store = app.store.clone();
    let users = blocking(move || directory::list_users(&store, &actor)).await?;
    Ok(Json(users))
}

#[derive(Deserialize)]
pub struct RoleBody {
    pub role: String,
}

/// POST /api/users/{id}/role
pub async fn set_role(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleBody>,
) -> Result<Json<User>, AppError> {
    let role: Role = body.role.trim().parse()?;
    let (store, config) = (app.store.clone(), app.config.clone());
    let user =
        blocking(move || directory::set_role(&store, &config, &actor, user_id, role)).await?;
    app.notify();
    Ok(Json(user))
}

/// DELETE /api/users/{id} — remove a user and everything they own.
pub async fn remove_user(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let store = app.store.clone();
    blocking(move || directory::remove_user(&store, &actor, user_id)).await?;
    app.notify();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/has-admin
pub async fn has_admin(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let has_admin = blocking(move || directory::has_admin(&store)).await?;
    Ok(Json(serde_json::json!({ "hasAdmin": has_admin })))
}
