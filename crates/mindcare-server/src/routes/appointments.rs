use axum::extract::{Path, State};
use axum::Json;
use mindcare_core::appointment::{Appointment, NewAppointment};
use mindcare_core::booking::{self, CounsellorAppointmentView, StudentAppointmentView};
use mindcare_core::lifecycle;
use mindcare_core::types::AppointmentStatus;
use serde::Deserialize;
use uuid::Uuid;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

/// POST /api/appointments — book a slot for the caller.
pub async fn create_appointment(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<NewAppointment>,
) -> Result<Json<Appointment>, AppError> {
    let (store, config) = (app.store.clone(), app.config.clone());
    let appt = blocking(move || booking::create_appointment(&store, &config, &actor, body)).await?;
    app.notify();
    Ok(Json(appt))
}

/// GET /api/appointments/mine — the caller's bookings with counsellor cards.
pub async fn list_mine(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<StudentAppointmentView>>, AppError> {
    let store = app.store.clone();
    let list = blocking(move || booking::list_for_student(&store, &actor)).await?;
    Ok(Json(list))
}

/// GET /api/appointments/counsellor — bookings with the caller as counsellor.
pub async fn list_for_counsellor(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<CounsellorAppointmentView>>, AppError> {
    let store = app.store.clone();
    let list = blocking(move || booking::list_for_counsellor(&store, &actor)).await?;
    Ok(Json(list))
}

/// GET /api/appointments/{id}
pub async fn get_appointment(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || booking::get(&store, &actor, id)).await?;
    Ok(Json(appt))
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// POST /api/appointments/{id}/status
pub async fn update_status(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Appointment>, AppError> {
    let status: AppointmentStatus = body.status.trim().parse()?;
    let (store, config) = (app.store.clone(), app.config.clone());
    let appt = blocking(move || lifecycle::update_status(&store, &config, &actor, id, status)).await?;
    app.notify();
    Ok(Json(appt))
}

/// POST /api/appointments/{id}/cancel
pub async fn cancel(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || lifecycle::cancel(&store, &actor, id)).await?;
    app.notify();
    Ok(Json(appt))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSessionBody {
    pub general_queries: String,
}

/// POST /api/appointments/{id}/pre-session-form
pub async fn submit_pre_session_form(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<PreSessionBody>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || {
        lifecycle::submit_pre_session_form(&store, &actor, id, body.general_queries)
    })
    .await?;
    app.notify();
    Ok(Json(appt))
}

/// DELETE /api/appointments/{id}/pre-session-form
pub async fn clear_pre_session_form(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let store = app.store.clone();
    let appt = blocking(move || lifecycle::clear_pre_session_form(&store, &actor, id)).await?;
    app.notify();
    Ok(Json(appt))
}
