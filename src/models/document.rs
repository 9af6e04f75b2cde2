use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document attached to a patient (scan, report, referral letter).
/// Ingestion happens elsewhere; the record service only lists the most
/// recent ones on the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub doc_type: String,
    pub document_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}
