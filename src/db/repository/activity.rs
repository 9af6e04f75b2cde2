//! Related-activity reads for the patient detail view, plus the inserts
//! the ingestion side (and tests) need.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Consultation, Document};

pub fn insert_consultation(
    conn: &Connection,
    consultation: &Consultation,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO consultations (id, patient_id, date, reason, conclusion)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            consultation.id.to_string(),
            consultation.patient_id.to_string(),
            consultation.date.to_rfc3339(),
            consultation.reason,
            consultation.conclusion,
        ],
    )?;
    Ok(())
}

/// Most recent consultations for a patient, newest first, capped.
pub fn recent_consultations(
    conn: &Connection,
    patient_id: &Uuid,
    limit: u32,
) -> Result<Vec<Consultation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, date, reason, conclusion
         FROM consultations WHERE patient_id = ?1
         ORDER BY date DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string(), limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut consultations = Vec::new();
    for row in rows {
        let (id, patient_id, date, reason, conclusion) = row?;
        consultations.push(Consultation {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            date: parse_timestamp(&date)?,
            reason,
            conclusion,
        });
    }
    Ok(consultations)
}

pub fn count_consultations(conn: &Connection, patient_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM consultations WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn insert_document(conn: &Connection, document: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, patient_id, title, doc_type, document_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            document.id.to_string(),
            document.patient_id.to_string(),
            document.title,
            document.doc_type,
            document.document_date.map(|d| d.to_string()),
            document.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Most recently added documents for a patient, newest first, capped.
pub fn recent_documents(
    conn: &Connection,
    patient_id: &Uuid,
    limit: u32,
) -> Result<Vec<Document>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, title, doc_type, document_date, created_at
         FROM documents WHERE patient_id = ?1
         ORDER BY created_at DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string(), limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut documents = Vec::new();
    for row in rows {
        let (id, patient_id, title, doc_type, document_date, created_at) = row?;
        documents.push(Document {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            title,
            doc_type,
            document_date: document_date
                .map(|d| {
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| {
                        DatabaseError::ConstraintViolation(format!("bad stored date {d}: {e}"))
                    })
                })
                .transpose()?,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(documents)
}

pub fn count_documents(conn: &Connection, patient_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad stored timestamp {s}: {e}")))
}
