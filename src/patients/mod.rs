//! Patient records — the service behind the patient API.
//!
//! Orchestrates validation, the national-ID uniqueness guard and the
//! repository for the five operations: list, create, detail, update,
//! archive. Derived fields (age) are computed here, never stored.

pub mod query;
pub mod validate;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{BloodType, Sex};
use crate::models::{Consultation, Document, Patient};
use crate::patients::query::ListParams;
use crate::patients::validate::FieldErrors;

/// Caps on the related activity returned with a patient detail.
const RECENT_CONSULTATIONS: u32 = 5;
const RECENT_DOCUMENTS: u32 = 10;

const DUPLICATE_NATIONAL_ID: &str = "a patient with this national ID already exists";

/// Everything a patient operation can fail with. The API layer maps these
/// onto HTTP statuses; nothing lower-level leaks past this boundary.
#[derive(Debug, Error)]
pub enum PatientError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Conflict(String),

    #[error("patient not found")]
    NotFound,

    #[error("patient has been archived")]
    Gone,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Write errors hit the unique national-ID index when the pre-write guard
/// lost a check-then-act race; surface those as the same conflict the
/// guard would have reported.
fn conflict_on_constraint(err: DatabaseError) -> PatientError {
    match err {
        DatabaseError::ConstraintViolation(_) => {
            PatientError::Conflict(DUPLICATE_NATIONAL_ID.into())
        }
        other => PatientError::Database(other),
    }
}

// ═══════════════════════════════════════════
// View types — serialised to the caller
// ═══════════════════════════════════════════

/// A full patient record as returned by create/update/detail, with the
/// derived age.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub national_id: Option<String>,
    pub phone: String,
    pub secondary_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub national_insurance_number: Option<String>,
    pub insurer_name: Option<String>,
    pub insurer_policy_number: Option<String>,
    pub blood_type: Option<BloodType>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub family_history: Option<String>,
    pub primary_care_physician: Option<String>,
    pub primary_diagnosis: Option<String>,
    pub cancer_discovery_date: Option<NaiveDate>,
    pub stage: Option<String>,
    pub histological_type: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub is_archived: bool,
    pub age: u32,
}

impl PatientRecord {
    fn from_patient(patient: Patient, today: NaiveDate) -> Self {
        let age = patient.age_on(today);
        Self {
            id: patient.id,
            last_name: patient.last_name,
            first_name: patient.first_name,
            birth_date: patient.birth_date,
            sex: patient.sex,
            national_id: patient.national_id,
            phone: patient.phone,
            secondary_phone: patient.secondary_phone,
            email: patient.email,
            address: patient.address,
            city: patient.city,
            national_insurance_number: patient.national_insurance_number,
            insurer_name: patient.insurer_name,
            insurer_policy_number: patient.insurer_policy_number,
            blood_type: patient.blood_type,
            allergies: patient.allergies,
            medical_history: patient.medical_history,
            family_history: patient.family_history,
            primary_care_physician: patient.primary_care_physician,
            primary_diagnosis: patient.primary_diagnosis,
            cancer_discovery_date: patient.cancer_discovery_date,
            stage: patient.stage,
            histological_type: patient.histological_type,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
            is_archived: patient.is_archived,
            age,
        }
    }
}

/// The compact row shape for the list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCard {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub national_id: Option<String>,
    pub phone: String,
    pub city: Option<String>,
    pub primary_diagnosis: Option<String>,
    pub stage: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub age: u32,
}

impl PatientCard {
    fn from_patient(patient: Patient, today: NaiveDate) -> Self {
        let age = patient.age_on(today);
        Self {
            id: patient.id,
            last_name: patient.last_name,
            first_name: patient.first_name,
            birth_date: patient.birth_date,
            sex: patient.sex,
            national_id: patient.national_id,
            phone: patient.phone,
            city: patient.city,
            primary_diagnosis: patient.primary_diagnosis,
            stage: patient.stage,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
            age,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of the patient list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPage {
    pub data: Vec<PatientCard>,
    pub pagination: Pagination,
}

/// Full detail view: the record plus a bounded window of related
/// activity, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    pub patient: PatientRecord,
    pub recent_consultations: Vec<Consultation>,
    pub recent_documents: Vec<Document>,
    pub consultation_count: i64,
    pub document_count: i64,
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

/// Create a patient from a raw JSON payload.
pub fn create_patient(
    conn: &Connection,
    input: &Map<String, Value>,
) -> Result<PatientRecord, PatientError> {
    let today = Utc::now().date_naive();
    let validated = validate::validate_create(input, today).map_err(PatientError::Validation)?;

    // Fast, friendly duplicate check. The unique index stays the
    // correctness backstop when two creates race past this point.
    if let Some(national_id) = &validated.national_id {
        if repository::find_patient_id_by_national_id(conn, national_id)?.is_some() {
            return Err(PatientError::Conflict(DUPLICATE_NATIONAL_ID.into()));
        }
    }

    let now = Utc::now();
    let patient = Patient {
        id: Uuid::new_v4(),
        last_name: validated.last_name,
        first_name: validated.first_name,
        birth_date: validated.birth_date,
        sex: validated.sex,
        national_id: validated.national_id,
        phone: validated.phone,
        secondary_phone: validated.secondary_phone,
        email: validated.email,
        address: validated.address,
        city: validated.city,
        national_insurance_number: validated.national_insurance_number,
        insurer_name: validated.insurer_name,
        insurer_policy_number: validated.insurer_policy_number,
        blood_type: validated.blood_type,
        allergies: validated.allergies,
        medical_history: validated.medical_history,
        family_history: validated.family_history,
        primary_care_physician: validated.primary_care_physician,
        primary_diagnosis: validated.primary_diagnosis,
        cancer_discovery_date: validated.cancer_discovery_date,
        stage: validated.stage,
        histological_type: validated.histological_type,
        created_at: now,
        updated_at: now,
        created_by_user_id: config::DEFAULT_USER_ID.to_string(),
        clinic_id: config::DEFAULT_CLINIC_ID.to_string(),
        is_archived: false,
    };

    repository::insert_patient(conn, &patient).map_err(conflict_on_constraint)?;
    tracing::debug!(patient_id = %patient.id, "patient created");

    Ok(PatientRecord::from_patient(patient, today))
}

/// Fetch a patient with its related recent activity.
pub fn get_patient_detail(conn: &Connection, id: &Uuid) -> Result<PatientDetail, PatientError> {
    let patient = repository::get_patient(conn, id)?.ok_or(PatientError::NotFound)?;
    if patient.is_archived {
        return Err(PatientError::Gone);
    }

    let recent_consultations = repository::recent_consultations(conn, id, RECENT_CONSULTATIONS)?;
    let recent_documents = repository::recent_documents(conn, id, RECENT_DOCUMENTS)?;
    let consultation_count = repository::count_consultations(conn, id)?;
    let document_count = repository::count_documents(conn, id)?;

    Ok(PatientDetail {
        patient: PatientRecord::from_patient(patient, Utc::now().date_naive()),
        recent_consultations,
        recent_documents,
        consultation_count,
        document_count,
    })
}

/// One page of patients matching the given raw parameters.
pub fn list_patients(
    conn: &Connection,
    params: &ListParams,
) -> Result<PatientPage, PatientError> {
    let query = query::compile(params).map_err(PatientError::Validation)?;

    let total = repository::count_patients(conn, &query)?;
    let patients = repository::list_patients(conn, &query)?;

    let today = Utc::now().date_naive();
    let data: Vec<PatientCard> = patients
        .into_iter()
        .map(|p| PatientCard::from_patient(p, today))
        .collect();

    let limit = query.limit as i64;
    let total_pages = (total + limit - 1) / limit;

    Ok(PatientPage {
        data,
        pagination: Pagination {
            page: query.page,
            limit: query.limit,
            total,
            total_pages,
        },
    })
}

/// Apply a partial update to an active patient.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    input: &Map<String, Value>,
) -> Result<PatientRecord, PatientError> {
    let mut patient = repository::get_patient(conn, id)?.ok_or(PatientError::NotFound)?;
    if patient.is_archived {
        return Err(PatientError::Gone);
    }

    let today = Utc::now().date_naive();
    let patch = validate::validate_update(input, today).map_err(PatientError::Validation)?;

    // Uniqueness guard, self excluded: only consulted when the incoming
    // value is set and differs from the stored one.
    if let Some(Some(new_national_id)) = &patch.national_id {
        if patient.national_id.as_deref() != Some(new_national_id.as_str()) {
            if let Some(holder) =
                repository::find_patient_id_by_national_id(conn, new_national_id)?
            {
                if &holder != id {
                    return Err(PatientError::Conflict(DUPLICATE_NATIONAL_ID.into()));
                }
            }
        }
    }

    patch.apply(&mut patient);
    patient.updated_at = Utc::now();

    let updated = repository::update_patient(conn, &patient).map_err(conflict_on_constraint)?;
    if !updated {
        // Row vanished between the fetch and the write.
        return Err(PatientError::NotFound);
    }

    Ok(PatientRecord::from_patient(patient, today))
}

/// Archive (soft-delete) an active patient. Archiving an archived record
/// reports `Gone` — observably not idempotent, so callers can tell
/// "already done" from "done now".
pub fn archive_patient(conn: &Connection, id: &Uuid) -> Result<(), PatientError> {
    let patient = repository::get_patient(conn, id)?.ok_or(PatientError::NotFound)?;
    if patient.is_archived {
        return Err(PatientError::Gone);
    }

    let archived = repository::archive_patient(conn, id, Utc::now())?;
    if !archived {
        return Err(PatientError::NotFound);
    }

    tracing::info!(patient_id = %id, "patient archived");
    Ok(())
}
