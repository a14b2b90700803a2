use axum::extract::{Path, State};
use axum::Json;
use mindcare_core::directory::{self, NewInstitution};
use mindcare_core::institution::Institution;
use mindcare_core::screening::{self, InstitutionAnalytics};
use mindcare_core::CareError;
use uuid::Uuid;

use super::blocking;
use crate::auth::CurrentActor;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/institutions
pub async fn list_institutions(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Institution>>, AppError> {
    let store = app.store.clone();
    let list = blocking(move || directory::list_institutions(&store, &actor)).await?;
    Ok(Json(list))
}

/// POST /api/institutions
pub async fn create_institution(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<NewInstitution>,
) -> Result<Json<Institution>, AppError> {
    let store = app.store.clone();
    let inst = blocking(move || directory::create_institution(&store, &actor, body)).await?;
    app.notify();
    Ok(Json(inst))
}

/// GET /api/institutions/by-domain/{domain} — public, used by sign-up pages
/// to brand themselves before anyone is signed in.
pub async fn by_domain(
    State(app): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<Institution>, AppError> {
    let store = app.store.clone();
    let lookup = domain.clone();
    let inst = blocking(move || directory::institution_by_domain(&store, &lookup)).await?;
    inst.map(Json)
        .ok_or_else(|| AppError(CareError::InstitutionNotFound(domain).into()))
}

/// GET /api/institutions/{id}/analytics
pub async fn analytics(
    State(app): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<InstitutionAnalytics>, AppError> {
    let store = app.store.clone();
    let report = blocking(move || screening::institution_analytics(&store, &actor, id)).await?;
    Ok(Json(report))
}
