//! Patient repository — CRUD, soft delete and filtered listing.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{BloodType, Sex};
use crate::models::Patient;
use crate::patients::query::PatientQuery;

const PATIENT_COLUMNS: &str = "id, last_name, first_name, birth_date, sex, national_id, phone,
     secondary_phone, email, address, city, national_insurance_number, insurer_name,
     insurer_policy_number, blood_type, allergies, medical_history, family_history,
     primary_care_physician, primary_diagnosis, cancer_discovery_date, stage,
     histological_type, created_at, updated_at, created_by_user_id, clinic_id, is_archived";

/// Insert a new patient. A duplicate national ID surfaces as
/// `ConstraintViolation` via the unique index, even when the pre-write
/// uniqueness check raced another writer.
pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, last_name, first_name, birth_date, sex, national_id, phone,
             secondary_phone, email, address, city, national_insurance_number, insurer_name,
             insurer_policy_number, blood_type, allergies, medical_history, family_history,
             primary_care_physician, primary_diagnosis, cancer_discovery_date, stage,
             histological_type, created_at, updated_at, created_by_user_id, clinic_id, is_archived)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
             ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
        params![
            patient.id.to_string(),
            patient.last_name,
            patient.first_name,
            patient.birth_date.to_string(),
            patient.sex.as_str(),
            patient.national_id,
            patient.phone,
            patient.secondary_phone,
            patient.email,
            patient.address,
            patient.city,
            patient.national_insurance_number,
            patient.insurer_name,
            patient.insurer_policy_number,
            patient.blood_type.as_ref().map(|b| b.as_str()),
            patient.allergies,
            patient.medical_history,
            patient.family_history,
            patient.primary_care_physician,
            patient.primary_diagnosis,
            patient.cancer_discovery_date.map(|d| d.to_string()),
            patient.stage,
            patient.histological_type,
            patient.created_at.to_rfc3339(),
            patient.updated_at.to_rfc3339(),
            patient.created_by_user_id,
            patient.clinic_id,
            patient.is_archived as i32,
        ],
    )
    .map_err(map_constraint)?;
    Ok(())
}

/// Update the mutable columns of an existing patient. `id`, `created_at`,
/// ownership fields and `is_archived` are never written here.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<bool, DatabaseError> {
    let rows_affected = conn
        .execute(
            "UPDATE patients SET
                 last_name = ?2, first_name = ?3, birth_date = ?4, sex = ?5, national_id = ?6,
                 phone = ?7, secondary_phone = ?8, email = ?9, address = ?10, city = ?11,
                 national_insurance_number = ?12, insurer_name = ?13, insurer_policy_number = ?14,
                 blood_type = ?15, allergies = ?16, medical_history = ?17, family_history = ?18,
                 primary_care_physician = ?19, primary_diagnosis = ?20,
                 cancer_discovery_date = ?21, stage = ?22, histological_type = ?23,
                 updated_at = ?24
             WHERE id = ?1",
            params![
                patient.id.to_string(),
                patient.last_name,
                patient.first_name,
                patient.birth_date.to_string(),
                patient.sex.as_str(),
                patient.national_id,
                patient.phone,
                patient.secondary_phone,
                patient.email,
                patient.address,
                patient.city,
                patient.national_insurance_number,
                patient.insurer_name,
                patient.insurer_policy_number,
                patient.blood_type.as_ref().map(|b| b.as_str()),
                patient.allergies,
                patient.medical_history,
                patient.family_history,
                patient.primary_care_physician,
                patient.primary_diagnosis,
                patient.cancer_discovery_date.map(|d| d.to_string()),
                patient.stage,
                patient.histological_type,
                patient.updated_at.to_rfc3339(),
            ],
        )
        .map_err(map_constraint)?;
    Ok(rows_affected > 0)
}

/// Get a patient by id, archived or not.
pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| {
            Ok(patient_row_from_rusqlite(row))
        })
        .optional()?;

    match row {
        Some(row) => Ok(Some(patient_from_row(row?)?)),
        None => Ok(None),
    }
}

/// Id of the record currently holding the given national ID, archived
/// records included.
pub fn find_patient_id_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM patients WHERE national_id = ?1",
            params![national_id],
            |row| row.get(0),
        )
        .optional()?;

    id.map(|s| Uuid::parse_str(&s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string())))
        .transpose()
}

/// Flag a patient as archived. Returns `false` when the id matches no row.
pub fn archive_patient(
    conn: &Connection,
    id: &Uuid,
    when: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let rows_affected = conn.execute(
        "UPDATE patients SET is_archived = 1, updated_at = ?2 WHERE id = ?1",
        params![id.to_string(), when.to_rfc3339()],
    )?;
    Ok(rows_affected > 0)
}

/// One page of patients matching the compiled query. Archived records are
/// excluded by the base predicate; ordering and paging come from the
/// query's allow-listed sort field.
pub fn list_patients(
    conn: &Connection,
    query: &PatientQuery,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let filter = filter_sql(query, &mut params_vec);

    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients{filter} ORDER BY {} {} LIMIT {} OFFSET {}",
        query.sort_by.column(),
        query.sort_order.sql(),
        query.limit,
        query.offset(),
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(patient_row_from_rusqlite(row))
    })?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row??)?);
    }
    Ok(patients)
}

/// Total number of patients matching the compiled query (ignoring paging).
pub fn count_patients(conn: &Connection, query: &PatientQuery) -> Result<i64, DatabaseError> {
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let filter = filter_sql(query, &mut params_vec);

    let sql = format!("SELECT COUNT(*) FROM patients{filter}");

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let count = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
    Ok(count)
}

/// Build the WHERE clause for a compiled query. Shared between the page
/// fetch and the total count so both always agree on the predicate.
fn filter_sql(
    query: &PatientQuery,
    params_vec: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
) -> String {
    let mut sql = String::from(" WHERE is_archived = 0");
    let mut param_idx = 1;

    if let Some(q) = &query.q {
        let pattern = format!("%{q}%");
        sql.push_str(&format!(
            " AND (last_name LIKE ?{p} COLLATE NOCASE
               OR first_name LIKE ?{p} COLLATE NOCASE
               OR national_id LIKE ?{p} COLLATE NOCASE
               OR phone LIKE ?{p})",
            p = param_idx
        ));
        params_vec.push(Box::new(pattern));
        param_idx += 1;
    }

    if let Some(sex) = &query.sex {
        sql.push_str(&format!(" AND sex = ?{param_idx}"));
        params_vec.push(Box::new(sex.as_str()));
        param_idx += 1;
    }

    if let Some(city) = &query.city {
        sql.push_str(&format!(" AND city LIKE ?{param_idx} COLLATE NOCASE"));
        params_vec.push(Box::new(format!("%{city}%")));
    }

    match query.has_diagnosis {
        Some(true) => sql.push_str(" AND primary_diagnosis IS NOT NULL"),
        Some(false) => sql.push_str(" AND primary_diagnosis IS NULL"),
        None => {}
    }

    sql
}

fn map_constraint(e: rusqlite::Error) -> DatabaseError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return DatabaseError::ConstraintViolation(e.to_string());
        }
    }
    DatabaseError::Sqlite(e)
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    last_name: String,
    first_name: String,
    birth_date: String,
    sex: String,
    national_id: Option<String>,
    phone: String,
    secondary_phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    city: Option<String>,
    national_insurance_number: Option<String>,
    insurer_name: Option<String>,
    insurer_policy_number: Option<String>,
    blood_type: Option<String>,
    allergies: Option<String>,
    medical_history: Option<String>,
    family_history: Option<String>,
    primary_care_physician: Option<String>,
    primary_diagnosis: Option<String>,
    cancer_discovery_date: Option<String>,
    stage: Option<String>,
    histological_type: Option<String>,
    created_at: String,
    updated_at: String,
    created_by_user_id: String,
    clinic_id: String,
    is_archived: i32,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        birth_date: row.get(3)?,
        sex: row.get(4)?,
        national_id: row.get(5)?,
        phone: row.get(6)?,
        secondary_phone: row.get(7)?,
        email: row.get(8)?,
        address: row.get(9)?,
        city: row.get(10)?,
        national_insurance_number: row.get(11)?,
        insurer_name: row.get(12)?,
        insurer_policy_number: row.get(13)?,
        blood_type: row.get(14)?,
        allergies: row.get(15)?,
        medical_history: row.get(16)?,
        family_history: row.get(17)?,
        primary_care_physician: row.get(18)?,
        primary_diagnosis: row.get(19)?,
        cancer_discovery_date: row.get(20)?,
        stage: row.get(21)?,
        histological_type: row.get(22)?,
        created_at: row.get(23)?,
        updated_at: row.get(24)?,
        created_by_user_id: row.get(25)?,
        clinic_id: row.get(26)?,
        is_archived: row.get(27)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        last_name: row.last_name,
        first_name: row.first_name,
        birth_date: parse_date(&row.birth_date)?,
        sex: Sex::from_str(&row.sex)?,
        national_id: row.national_id,
        phone: row.phone,
        secondary_phone: row.secondary_phone,
        email: row.email,
        address: row.address,
        city: row.city,
        national_insurance_number: row.national_insurance_number,
        insurer_name: row.insurer_name,
        insurer_policy_number: row.insurer_policy_number,
        blood_type: row.blood_type.as_deref().map(BloodType::from_str).transpose()?,
        allergies: row.allergies,
        medical_history: row.medical_history,
        family_history: row.family_history,
        primary_care_physician: row.primary_care_physician,
        primary_diagnosis: row.primary_diagnosis,
        cancer_discovery_date: row
            .cancer_discovery_date
            .as_deref()
            .map(parse_date)
            .transpose()?,
        stage: row.stage,
        histological_type: row.histological_type,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        created_by_user_id: row.created_by_user_id,
        clinic_id: row.clinic_id,
        is_archived: row.is_archived != 0,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad stored date {s}: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad stored timestamp {s}: {e}")))
}
