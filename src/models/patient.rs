use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BloodType, Sex};

/// A patient record. `id`, timestamps and ownership fields are
/// server-assigned; `is_archived` is the soft-delete flag and never
/// goes back to `false` through the write paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_user_id: String,
    pub clinic_id: String,
    pub is_archived: bool,
}

impl Patient {
    /// Age in whole years on the given day. Calendar-exact: the year
    /// difference is reduced by one until the birthday has passed.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        age_between(self.birth_date, today)
    }
}

/// Whole years elapsed from `birth` to `today`.
pub fn age_between(birth: NaiveDate, today: NaiveDate) -> u32 {
    use chrono::Datelike;

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}
