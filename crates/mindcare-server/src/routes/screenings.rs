use axum::extract::State;
use axum::Json;
use mindcare_core::screening::{self, ScreeningResult};
use mindcare_core::types::ScreeningTool;
use serde::Deserialize;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningBody {
    pub tool_type: String,
    pub responses: Vec<u32>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// POST /api/screenings — score and store a questionnaire.
pub async fn submit(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<ScreeningBody>,
) -> Result<Json<ScreeningResult>, AppError> {
    let tool: ScreeningTool = body.tool_type.trim().parse()?;
    let (store, config) = (app.store.clone(), app.config.clone());
    let result = blocking(move || {
        screening::submit(&store, &config, &actor, tool, body.responses, body.is_anonymous)
    })
    .await?;
    app.notify();
    Ok(Json(result))
}

/// GET /api/screenings/mine — newest first.
pub async fn list_mine(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<ScreeningResult>>, AppError> {
    let store = app.store.clone();
    let list = blocking(move || screening::list_for_user(&store, &actor)).await?;
    Ok(Json(list))
}
