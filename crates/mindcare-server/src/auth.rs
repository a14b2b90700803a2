//! Caller identification.
//!
//! The identity provider in front of this service authenticates the user and
//! forwards their id in [`USER_HEADER`]. Deployments that cannot trust the
//! network between the two also set `server.api_token`, which every request
//! must then present as a bearer token.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use mindcare_core::policy::Actor;
use mindcare_core::store::Records;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-mindcare-user";

/// The resolved caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, app: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthenticated(format!("missing {USER_HEADER} header")))?;
        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::unauthenticated(format!("malformed {USER_HEADER} header")))?;

        let store = app.store.clone();
        let user = tokio::task::spawn_blocking(move || store.snapshot()?.user(user_id))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

        match user {
            Some(user) => Ok(CurrentActor(Actor::from(&user))),
            None => {
                tracing::debug!(user = %user_id, "request from unknown user");
                Err(AppError::unauthenticated(format!("unknown user {user_id}")))
            }
        }
    }
}

/// Gate every request behind `server.api_token` when one is configured.
/// Without a token the middleware passes everything through.
pub async fn require_token(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let Some(token) = app.config.server.api_token.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(token) {
        return next.run(req).await;
    }

    AppError::unauthenticated("missing or invalid bearer token").into_response()
}

