//! Query compiler — turns raw, untrusted list parameters into a typed
//! query the repository can execute.
//!
//! Coercion rules: `page`/`limit` fall back to their defaults on
//! non-numeric or non-positive input; an unknown `sex` is ignored; an
//! unknown `sortBy` or `sortOrder` is a validation error, never passed
//! through to SQL.

use serde::Deserialize;
use std::str::FromStr;

use crate::models::enums::Sex;
use crate::patients::validate::{push_error, FieldErrors};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

/// Raw list parameters as they arrive on the query string. Everything is
/// optional and string-typed; [`compile`] does the coercion.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListParams {
    pub q: Option<String>,
    pub sex: Option<String>,
    pub city: Option<String>,
    pub has_diagnosis: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Sortable columns. Client input is matched against this allow-list;
/// the raw sort key is never spliced into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    LastName,
    FirstName,
    BirthDate,
    City,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "lastName" => Some(Self::LastName),
            "firstName" => Some(Self::FirstName),
            "birthDate" => Some(Self::BirthDate),
            "city" => Some(Self::City),
            _ => None,
        }
    }

    /// Column the field sorts on.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::LastName => "last_name",
            Self::FirstName => "first_name",
            Self::BirthDate => "birth_date",
            Self::City => "city",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A compiled, fully typed patient list query. The base predicate
/// (archived records excluded) is applied by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientQuery {
    pub q: Option<String>,
    pub sex: Option<Sex>,
    pub city: Option<String>,
    pub has_diagnosis: Option<bool>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl PatientQuery {
    pub fn offset(&self) -> u64 {
        // u64 keeps page * limit from overflowing on hostile input.
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// Compile raw parameters into a [`PatientQuery`], or report the fields
/// that cannot be interpreted.
pub fn compile(params: &ListParams) -> Result<PatientQuery, FieldErrors> {
    let mut errors = FieldErrors::new();

    let sort_by = match params.sort_by.as_deref() {
        None => SortField::CreatedAt,
        Some(raw) => SortField::parse(raw).unwrap_or_else(|| {
            push_error(
                &mut errors,
                "sortBy",
                "must be one of createdAt, updatedAt, lastName, firstName, birthDate, city",
            );
            SortField::CreatedAt
        }),
    };

    let sort_order = match params.sort_order.as_deref() {
        None => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some("desc") => SortOrder::Desc,
        Some(_) => {
            push_error(&mut errors, "sortOrder", "must be asc or desc");
            SortOrder::Desc
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(PatientQuery {
        q: trimmed(params.q.as_deref()),
        sex: params
            .sex
            .as_deref()
            .and_then(|raw| Sex::from_str(raw).ok()),
        city: trimmed(params.city.as_deref()),
        has_diagnosis: match params.has_diagnosis.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        },
        sort_by,
        sort_order,
        page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
        limit: positive_or(params.limit.as_deref(), DEFAULT_LIMIT),
    })
}

fn trimmed(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
