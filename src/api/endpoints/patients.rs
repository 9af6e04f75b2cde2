//! Patient endpoints.
//!
//! Five operations:
//! - `GET    /api/patients` — paginated, filtered list
//! - `POST   /api/patients` — create
//! - `GET    /api/patients/:id` — detail with age and recent activity
//! - `PUT    /api/patients/:id` — partial update
//! - `DELETE /api/patients/:id` — archive (soft delete)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::patients;
use crate::patients::query::ListParams;
use crate::patients::{PatientDetail, PatientPage, PatientRecord};

/// `GET /api/patients` — one page of patients.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<PatientPage>, ApiError> {
    let conn = ctx.open_db()?;
    let page = patients::list_patients(&conn, &params)?;
    Ok(Json(page))
}

/// `POST /api/patients` — create a patient, 201 on success.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<PatientRecord>), ApiError> {
    let input = as_object(&body)?;
    let conn = ctx.open_db()?;
    let record = patients::create_patient(&conn, input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/patients/:id` — full patient detail.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientDetail>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.open_db()?;
    let detail = patients::get_patient_detail(&conn, &id)?;
    Ok(Json(detail))
}

/// `PUT /api/patients/:id` — apply a partial update.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<PatientRecord>, ApiError> {
    let id = parse_id(&id)?;
    let input = as_object(&body)?;
    let conn = ctx.open_db()?;
    let record = patients::update_patient(&conn, &id, input)?;
    Ok(Json(record))
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub id: Uuid,
    pub message: &'static str,
}

/// `DELETE /api/patients/:id` — archive. A second call on the same id
/// returns 410, not success.
pub async fn archive(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ArchiveResponse>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.open_db()?;
    patients::archive_patient(&conn, &id)?;
    Ok(Json(ArchiveResponse {
        id,
        message: "patient archived",
    }))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid patient ID: {e}")))
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON object".into()))
}
