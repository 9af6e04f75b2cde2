use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consultation attached to a patient. Written by the consultation
/// workflow (out of scope here); surfaced read-only on the patient
/// detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date: DateTime<Utc>,
    pub reason: Option<String>,
    pub conclusion: Option<String>,
}
