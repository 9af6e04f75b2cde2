//! Field validator — pure mapping from a raw JSON object to either a
//! normalized write input or a field→messages error map.
//!
//! All violated fields are reported together, never fail-fast. A field of
//! the wrong JSON type is a per-field error like any other; only a body
//! that is not an object at all is rejected upstream of this module.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::enums::{BloodType, Sex};
use crate::models::Patient;

/// Field name → ordered list of human-readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub(crate) fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

static NATIONAL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}[0-9]{5,7}$").unwrap());

// Syntactic check only: one @, no whitespace, a dot somewhere in the domain.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// A fully validated create input. Server-assigned fields (id, timestamps,
/// ownership, archive flag) are added by the record service.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPatient {
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
}

/// A validated partial update. Outer `None` means "field untouched";
/// for clearable fields, `Some(None)` means "set to null". Required
/// fields can be replaced but never cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientPatch {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub national_id: Option<Option<String>>,
    pub secondary_phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub national_insurance_number: Option<Option<String>>,
    pub insurer_name: Option<Option<String>>,
    pub insurer_policy_number: Option<Option<String>>,
    pub blood_type: Option<Option<BloodType>>,
    pub allergies: Option<Option<String>>,
    pub medical_history: Option<Option<String>>,
    pub family_history: Option<Option<String>>,
    pub primary_care_physician: Option<Option<String>>,
    pub primary_diagnosis: Option<Option<String>>,
    pub cancer_discovery_date: Option<Option<NaiveDate>>,
    pub stage: Option<Option<String>>,
    pub histological_type: Option<Option<String>>,
}

impl PatientPatch {
    /// Merge the patch into an existing record. Identity, timestamps,
    /// ownership and the archive flag are untouched by design.
    pub fn apply(self, patient: &mut Patient) {
        if let Some(v) = self.last_name {
            patient.last_name = v;
        }
        if let Some(v) = self.first_name {
            patient.first_name = v;
        }
        if let Some(v) = self.birth_date {
            patient.birth_date = v;
        }
        if let Some(v) = self.sex {
            patient.sex = v;
        }
        if let Some(v) = self.phone {
            patient.phone = v;
        }
        if let Some(v) = self.national_id {
            patient.national_id = v;
        }
        if let Some(v) = self.secondary_phone {
            patient.secondary_phone = v;
        }
        if let Some(v) = self.email {
            patient.email = v;
        }
        if let Some(v) = self.address {
            patient.address = v;
        }
        if let Some(v) = self.city {
            patient.city = v;
        }
        if let Some(v) = self.national_insurance_number {
            patient.national_insurance_number = v;
        }
        if let Some(v) = self.insurer_name {
            patient.insurer_name = v;
        }
        if let Some(v) = self.insurer_policy_number {
            patient.insurer_policy_number = v;
        }
        if let Some(v) = self.blood_type {
            patient.blood_type = v;
        }
        if let Some(v) = self.allergies {
            patient.allergies = v;
        }
        if let Some(v) = self.medical_history {
            patient.medical_history = v;
        }
        if let Some(v) = self.family_history {
            patient.family_history = v;
        }
        if let Some(v) = self.primary_care_physician {
            patient.primary_care_physician = v;
        }
        if let Some(v) = self.primary_diagnosis {
            patient.primary_diagnosis = v;
        }
        if let Some(v) = self.cancer_discovery_date {
            patient.cancer_discovery_date = v;
        }
        if let Some(v) = self.stage {
            patient.stage = v;
        }
        if let Some(v) = self.histological_type {
            patient.histological_type = v;
        }
    }
}

/// Validate a create payload. Requires lastName, firstName, birthDate,
/// sex and phone; everything else is optional.
pub fn validate_create(
    input: &Map<String, Value>,
    today: NaiveDate,
) -> Result<ValidatedPatient, FieldErrors> {
    let mut errors = FieldErrors::new();

    let last_name = required(input, "lastName", &mut errors, |v, k, e| {
        string_min(v, k, 2, e)
    });
    let first_name = required(input, "firstName", &mut errors, |v, k, e| {
        string_min(v, k, 2, e)
    });
    let birth_date = required(input, "birthDate", &mut errors, |v, k, e| {
        birth_date_value(v, k, today, e)
    });
    let sex = required(input, "sex", &mut errors, sex_value);
    let phone = required(input, "phone", &mut errors, |v, k, e| {
        string_min(v, k, 10, e)
    });

    let national_id = optional(input, "nationalId", &mut errors, national_id_value).flatten();
    let email = optional(input, "email", &mut errors, email_value).flatten();
    let blood_type = optional(input, "bloodType", &mut errors, blood_type_value);
    let cancer_discovery_date = optional(input, "cancerDiscoveryDate", &mut errors, date_value);

    let secondary_phone = optional(input, "secondaryPhone", &mut errors, text_value);
    let address = optional(input, "address", &mut errors, text_value);
    let city = optional(input, "city", &mut errors, text_value);
    let national_insurance_number =
        optional(input, "nationalInsuranceNumber", &mut errors, text_value);
    let insurer_name = optional(input, "insurerName", &mut errors, text_value);
    let insurer_policy_number = optional(input, "insurerPolicyNumber", &mut errors, text_value);
    let allergies = optional(input, "allergies", &mut errors, text_value);
    let medical_history = optional(input, "medicalHistory", &mut errors, text_value);
    let family_history = optional(input, "familyHistory", &mut errors, text_value);
    let primary_care_physician = optional(input, "primaryCarePhysician", &mut errors, text_value);
    let primary_diagnosis = optional(input, "primaryDiagnosis", &mut errors, text_value);
    let stage = optional(input, "stage", &mut errors, text_value);
    let histological_type = optional(input, "histologicalType", &mut errors, text_value);

    match (last_name, first_name, birth_date, sex, phone) {
        (Some(last_name), Some(first_name), Some(birth_date), Some(sex), Some(phone))
            if errors.is_empty() =>
        {
            Ok(ValidatedPatient {
                last_name,
                first_name,
                birth_date,
                sex,
                national_id,
                phone,
                secondary_phone,
                email,
                address,
                city,
                national_insurance_number,
                insurer_name,
                insurer_policy_number,
                blood_type,
                allergies,
                medical_history,
                family_history,
                primary_care_physician,
                primary_diagnosis,
                cancer_discovery_date,
                stage,
                histological_type,
            })
        }
        _ => Err(errors),
    }
}

/// Validate an update payload. Every field is optional; a clearable field
/// set to JSON null (or, for nationalId/email, the empty string) clears.
pub fn validate_update(
    input: &Map<String, Value>,
    today: NaiveDate,
) -> Result<PatientPatch, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut patch = PatientPatch::default();

    if let Some(value) = input.get("lastName") {
        patch.last_name = string_min(value, "lastName", 2, &mut errors);
    }
    if let Some(value) = input.get("firstName") {
        patch.first_name = string_min(value, "firstName", 2, &mut errors);
    }
    if let Some(value) = input.get("birthDate") {
        patch.birth_date = birth_date_value(value, "birthDate", today, &mut errors);
    }
    if let Some(value) = input.get("sex") {
        patch.sex = sex_value(value, "sex", &mut errors);
    }
    if let Some(value) = input.get("phone") {
        patch.phone = string_min(value, "phone", 10, &mut errors);
    }

    if let Some(value) = input.get("nationalId") {
        patch.national_id = match value {
            Value::Null => Some(None),
            _ => national_id_value(value, "nationalId", &mut errors),
        };
    }
    if let Some(value) = input.get("email") {
        patch.email = match value {
            Value::Null => Some(None),
            _ => email_value(value, "email", &mut errors),
        };
    }
    if let Some(value) = input.get("bloodType") {
        patch.blood_type = match value {
            Value::Null => Some(None),
            _ => blood_type_value(value, "bloodType", &mut errors).map(Some),
        };
    }
    if let Some(value) = input.get("cancerDiscoveryDate") {
        patch.cancer_discovery_date = match value {
            Value::Null => Some(None),
            _ => date_value(value, "cancerDiscoveryDate", &mut errors).map(Some),
        };
    }

    patch_text(input, "secondaryPhone", &mut patch.secondary_phone, &mut errors);
    patch_text(input, "address", &mut patch.address, &mut errors);
    patch_text(input, "city", &mut patch.city, &mut errors);
    patch_text(
        input,
        "nationalInsuranceNumber",
        &mut patch.national_insurance_number,
        &mut errors,
    );
    patch_text(input, "insurerName", &mut patch.insurer_name, &mut errors);
    patch_text(
        input,
        "insurerPolicyNumber",
        &mut patch.insurer_policy_number,
        &mut errors,
    );
    patch_text(input, "allergies", &mut patch.allergies, &mut errors);
    patch_text(input, "medicalHistory", &mut patch.medical_history, &mut errors);
    patch_text(input, "familyHistory", &mut patch.family_history, &mut errors);
    patch_text(
        input,
        "primaryCarePhysician",
        &mut patch.primary_care_physician,
        &mut errors,
    );
    patch_text(
        input,
        "primaryDiagnosis",
        &mut patch.primary_diagnosis,
        &mut errors,
    );
    patch_text(input, "stage", &mut patch.stage, &mut errors);
    patch_text(
        input,
        "histologicalType",
        &mut patch.histological_type,
        &mut errors,
    );

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

// ── Presence dispatch ───────────────────────────────────────────────────────

fn required<T>(
    input: &Map<String, Value>,
    key: &str,
    errors: &mut FieldErrors,
    check: impl Fn(&Value, &str, &mut FieldErrors) -> Option<T>,
) -> Option<T> {
    match input.get(key) {
        None | Some(Value::Null) => {
            push_error(errors, key, "is required");
            None
        }
        Some(value) => check(value, key, errors),
    }
}

fn optional<T>(
    input: &Map<String, Value>,
    key: &str,
    errors: &mut FieldErrors,
    check: impl Fn(&Value, &str, &mut FieldErrors) -> Option<T>,
) -> Option<T> {
    match input.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => check(value, key, errors),
    }
}

fn patch_text(
    input: &Map<String, Value>,
    key: &str,
    target: &mut Option<Option<String>>,
    errors: &mut FieldErrors,
) {
    if let Some(value) = input.get(key) {
        *target = match value {
            Value::Null => Some(None),
            _ => text_value(value, key, errors).map(Some),
        };
    }
}

// ── Per-field checks ────────────────────────────────────────────────────────

fn string_min(value: &Value, key: &str, min: usize, errors: &mut FieldErrors) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.chars().count() < min {
                push_error(errors, key, format!("must be at least {min} characters"));
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

fn text_value(value: &Value, key: &str, errors: &mut FieldErrors) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

fn date_value(value: &Value, key: &str, errors: &mut FieldErrors) -> Option<NaiveDate> {
    match value {
        Value::String(s) => match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                push_error(errors, key, "must be a valid date (YYYY-MM-DD)");
                None
            }
        },
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

fn birth_date_value(
    value: &Value,
    key: &str,
    today: NaiveDate,
    errors: &mut FieldErrors,
) -> Option<NaiveDate> {
    let date = date_value(value, key, errors)?;
    if date > today {
        push_error(errors, key, "must be in the past");
        None
    } else {
        Some(date)
    }
}

fn sex_value(value: &Value, key: &str, errors: &mut FieldErrors) -> Option<Sex> {
    match value {
        Value::String(s) => Sex::from_str(s).ok().or_else(|| {
            push_error(errors, key, "must be MALE or FEMALE");
            None
        }),
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

fn blood_type_value(value: &Value, key: &str, errors: &mut FieldErrors) -> Option<BloodType> {
    match value {
        Value::String(s) => BloodType::from_str(s).ok().or_else(|| {
            push_error(errors, key, "must be one of the eight ABO/Rh blood types");
            None
        }),
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

/// Empty string is treated as absent, not as an error.
fn national_id_value(
    value: &Value,
    key: &str,
    errors: &mut FieldErrors,
) -> Option<Option<String>> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(None)
            } else if NATIONAL_ID_RE.is_match(trimmed) {
                Some(Some(trimmed.to_string()))
            } else {
                push_error(errors, key, "invalid format (expected e.g. BE123456)");
                None
            }
        }
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

/// Empty string is treated as absent, not as an error.
fn email_value(value: &Value, key: &str, errors: &mut FieldErrors) -> Option<Option<String>> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(None)
            } else if EMAIL_RE.is_match(trimmed) {
                Some(Some(trimmed.to_string()))
            } else {
                push_error(errors, key, "must be a valid email address");
                None
            }
        }
        _ => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}
