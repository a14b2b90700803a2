use axum::extract::{Path, Query, State};
use axum::Json;
use mindcare_core::appointment::Appointment;
use mindcare_core::booking;
use mindcare_core::counsellor::{Availability, Counsellor};
use mindcare_core::directory::{self, CounsellorCard, NewCounsellor};
use serde::Deserialize;
use uuid::Uuid;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/counsellors — active counsellors of the caller's institution.
pub async fn list_counsellors(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<CounsellorCard>>, AppError> {
    let store = app.store.clone();
    let list = blocking(move || directory::list_counsellors(&store, &actor)).await?;
    Ok(Json(list))
}

/// POST /api/counsellors
pub async fn create_counsellor(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<NewCounsellor>,
) -> Result<Json<Counsellor>, AppError> {
    let store = app.store.clone();
    let profile = blocking(move || directory::create_counsellor(&store, &actor, body)).await?;
    app.notify();
    Ok(Json(profile))
}

/// GET /api/counsellors/{id}
pub async fn get_counsellor(
    State(app): State<AppState>,
    CurrentActor(_): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<CounsellorCard>, AppError> {
    let store = app.store.clone();
    let card = blocking(move || directory::get_counsellor(&store, id)).await?;
    Ok(Json(card))
}

/// PUT /api/counsellors/{id}/availability
pub async fn update_availability(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(availability): Json<Availability>,
) -> Result<Json<Counsellor>, AppError> {
    let store = app.store.clone();
    let profile =
        blocking(move || directory::update_availability(&store, &actor, id, availability)).await?;
    app.notify();
    Ok(Json(profile))
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: String,
}

/// GET /api/counsellors/{id}/booked?date=YYYY-MM-DD
pub async fn booked_slots(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let store = app.store.clone();
    let booked = blocking(move || booking::booked_slots(&store, &actor, id, &q.date)).await?;
    Ok(Json(booked))
}

/// GET /api/counsellors/{id}/open?date=YYYY-MM-DD
pub async fn open_slots(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let store = app.store.clone();
    let open = blocking(move || booking::open_slots(&store, &actor, id, &q.date)).await?;
    Ok(Json(open))
}
