//! Session outcome and follow-up handlers.

use axum::extract::{Path, State};
use axum::Json;
use mindcare_core::appointment::{Appointment, FollowUp, FollowUpTerms, SessionResult};
use mindcare_core::lifecycle;
use serde::Deserialize;
use uuid::Uuid;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

/// Session result as clients send it. `followUp` is either a free-text note
/// or a JSON object string with `"proposed": true`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionResultBody {
    pub session_notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up: Option<String>,
}

impl From<SessionResultBody> for SessionResult {
    fn from(body: SessionResultBody) -> Self {
        SessionResult {
            session_notes: body.session_notes,
            diagnosis: body.diagnosis,
            follow_up: body.follow_up.as_deref().and_then(FollowUp::from_legacy),
        }
    }
}

/// POST /api/appointments/{id}/session-result
pub async fn add_session_result(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<SessionResultBody>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let result = SessionResult::from(body);
    let appt = blocking(move || lifecycle::add_session_result(&store, &actor, id, result)).await?;
    app.notify();
    Ok(Json(appt))
}

/// POST /api/appointments/{id}/follow-up
pub async fn propose_follow_up(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(terms): Json<FollowUpTerms>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || lifecycle::propose_follow_up(&store, &actor, id, terms)).await?;
    app.notify();
    Ok(Json(appt))
}

/// POST /api/appointments/{id}/follow-up/accept
pub async fn accept_follow_up(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || lifecycle::accept_follow_up(&store, &actor, id)).await?;
    app.notify();
    Ok(Json(appt))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RejectBody {
    pub reason: Option<String>,
}

/// POST /api/appointments/{id}/follow-up/reject
pub async fn reject_follow_up(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectBody>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt =
        blocking(move || lifecycle::reject_follow_up(&store, &actor, id, body.reason)).await?;
    app.notify();
    Ok(Json(appt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_follow_up_string_becomes_proposal() {
        let body: SessionResultBody = serde_json::from_value(serde_json::json!({
            "sessionNotes": "talked through exams",
            "followUp": r#"{"proposed":true,"date":"2099-02-01","timeSlot":"11:00"}"#,
        }))
        .unwrap();
        let result = SessionResult::from(body);
        match result.follow_up {
            Some(FollowUp::Proposal(terms)) => {
                assert_eq!(terms.date.as_deref(), Some("2099-02-01"));
                assert_eq!(terms.time_slot.as_deref(), Some("11:00"));
            }
            other => panic!("expected proposal, got {other:?}"),
        }
    }

    #[test]
    fn plain_follow_up_string_is_a_note() {
        let body: SessionResultBody =
            serde_json::from_value(serde_json::json!({ "followUp": "check in next week" })).unwrap();
        assert_eq!(
            SessionResult::from(body).follow_up,
            Some(FollowUp::Note {
                text: "check in next week".into()
            })
        );
    }

    #[test]
    fn missing_follow_up_is_none() {
        let body: SessionResultBody = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(SessionResult::from(body).follow_up.is_none());
    }
}
