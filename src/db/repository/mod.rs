//! Repository layer — entity-scoped database operations.

mod activity;
mod patient;

// Re-export all public items from sub-modules
pub use activity::*;
pub use patient::*;

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use rusqlite::Connection;
    use uuid::Uuid;

    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::DatabaseError;
    use crate::models::enums::Sex;
    use crate::models::{Consultation, Document, Patient};
    use crate::patients::query::{compile, ListParams};

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_patient(last_name: &str, national_id: Option<&str>) -> Patient {
        let now = Utc::now();
        Patient {
            id: Uuid::new_v4(),
            last_name: last_name.into(),
            first_name: "Test".into(),
            birth_date: NaiveDate::from_ymd_opt(1975, 5, 20).unwrap(),
            sex: Sex::Male,
            national_id: national_id.map(String::from),
            phone: "0611111111".into(),
            secondary_phone: None,
            email: None,
            address: None,
            city: None,
            national_insurance_number: None,
            insurer_name: None,
            insurer_policy_number: None,
            blood_type: None,
            allergies: None,
            medical_history: None,
            family_history: None,
            primary_care_physician: None,
            primary_diagnosis: None,
            cancer_discovery_date: None,
            stage: None,
            histological_type: None,
            created_at: now,
            updated_at: now,
            created_by_user_id: "user-default".into(),
            clinic_id: "clinic-default".into(),
            is_archived: false,
        }
    }

    fn default_query() -> crate::patients::query::PatientQuery {
        compile(&ListParams::default()).unwrap()
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = test_db();
        let patient = make_patient("Rossi", Some("AB123456"));
        insert_patient(&conn, &patient).unwrap();

        let fetched = get_patient(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(fetched, patient);
    }

    #[test]
    fn get_unknown_id_returns_none() {
        let conn = test_db();
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn unique_index_rejects_duplicate_national_id() {
        let conn = test_db();
        insert_patient(&conn, &make_patient("First", Some("BE123456"))).unwrap();

        // Bypasses the service-level guard entirely: the index itself
        // must reject the duplicate.
        let err = insert_patient(&conn, &make_patient("Second", Some("BE123456"))).unwrap_err();
        assert!(
            matches!(err, DatabaseError::ConstraintViolation(_)),
            "{err:?}"
        );
    }

    #[test]
    fn several_patients_without_national_id_coexist() {
        let conn = test_db();
        insert_patient(&conn, &make_patient("One", None)).unwrap();
        insert_patient(&conn, &make_patient("Two", None)).unwrap();
        assert_eq!(count_patients(&conn, &default_query()).unwrap(), 2);
    }

    #[test]
    fn find_by_national_id_sees_archived_rows() {
        let conn = test_db();
        let patient = make_patient("Archived", Some("ZZ99999"));
        insert_patient(&conn, &patient).unwrap();
        archive_patient(&conn, &patient.id, Utc::now()).unwrap();

        let holder = find_patient_id_by_national_id(&conn, "ZZ99999").unwrap();
        assert_eq!(holder, Some(patient.id));
    }

    #[test]
    fn update_rewrites_mutable_fields_only() {
        let conn = test_db();
        let mut patient = make_patient("Before", None);
        insert_patient(&conn, &patient).unwrap();

        patient.last_name = "After".into();
        patient.city = Some("Tanger".into());
        patient.updated_at = Utc::now();
        assert!(update_patient(&conn, &patient).unwrap());

        let fetched = get_patient(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(fetched.last_name, "After");
        assert_eq!(fetched.city.as_deref(), Some("Tanger"));
        assert_eq!(fetched.created_at, patient.created_at);
    }

    #[test]
    fn update_missing_row_reports_false() {
        let conn = test_db();
        let patient = make_patient("Ghost", None);
        assert!(!update_patient(&conn, &patient).unwrap());
    }

    #[test]
    fn archive_flags_row_and_list_skips_it() {
        let conn = test_db();
        let patient = make_patient("Hidden", None);
        insert_patient(&conn, &patient).unwrap();

        assert!(archive_patient(&conn, &patient.id, Utc::now()).unwrap());
        let fetched = get_patient(&conn, &patient.id).unwrap().unwrap();
        assert!(fetched.is_archived);

        assert_eq!(count_patients(&conn, &default_query()).unwrap(), 0);
        assert!(list_patients(&conn, &default_query()).unwrap().is_empty());
    }

    #[test]
    fn archive_missing_row_reports_false() {
        let conn = test_db();
        assert!(!archive_patient(&conn, &Uuid::new_v4(), Utc::now()).unwrap());
    }

    #[test]
    fn combined_filters_compose() {
        let conn = test_db();

        let mut match_all = make_patient("Benali", None);
        match_all.sex = Sex::Female;
        match_all.city = Some("Casablanca".into());
        match_all.primary_diagnosis = Some("NSCLC".into());
        insert_patient(&conn, &match_all).unwrap();

        let mut wrong_city = make_patient("Benali", None);
        wrong_city.sex = Sex::Female;
        wrong_city.city = Some("Rabat".into());
        wrong_city.primary_diagnosis = Some("NSCLC".into());
        insert_patient(&conn, &wrong_city).unwrap();

        let query = compile(&ListParams {
            q: Some("bena".into()),
            sex: Some("FEMALE".into()),
            city: Some("casa".into()),
            has_diagnosis: Some("true".into()),
            ..Default::default()
        })
        .unwrap();

        let rows = list_patients(&conn, &query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, match_all.id);
        assert_eq!(count_patients(&conn, &query).unwrap(), 1);
    }

    #[test]
    fn search_is_case_insensitive_for_names_not_required_for_phone() {
        let conn = test_db();
        let mut patient = make_patient("DUPONT", Some("CD654321"));
        patient.phone = "0699887766".into();
        insert_patient(&conn, &patient).unwrap();

        for q in ["dupont", "cd654", "99887"] {
            let query = compile(&ListParams {
                q: Some(q.into()),
                ..Default::default()
            })
            .unwrap();
            assert_eq!(list_patients(&conn, &query).unwrap().len(), 1, "q={q:?}");
        }
    }

    #[test]
    fn list_respects_limit_and_offset() {
        let conn = test_db();
        for i in 0..5 {
            let mut p = make_patient(&format!("P{i}"), None);
            p.created_at = Utc::now() + Duration::seconds(i);
            insert_patient(&conn, &p).unwrap();
        }

        let query = compile(&ListParams {
            page: Some("2".into()),
            limit: Some("2".into()),
            sort_by: Some("lastName".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        })
        .unwrap();

        let rows = list_patients(&conn, &query).unwrap();
        let names: Vec<&str> = rows.iter().map(|p| p.last_name.as_str()).collect();
        assert_eq!(names, vec!["P2", "P3"]);
    }

    #[test]
    fn consultations_come_back_newest_first_and_capped() {
        let conn = test_db();
        let patient = make_patient("Consult", None);
        insert_patient(&conn, &patient).unwrap();

        for i in 0..4 {
            insert_consultation(
                &conn,
                &Consultation {
                    id: Uuid::new_v4(),
                    patient_id: patient.id,
                    date: Utc::now() - Duration::days(i),
                    reason: Some(format!("visit {i}")),
                    conclusion: None,
                },
            )
            .unwrap();
        }

        let recent = recent_consultations(&conn, &patient.id, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reason.as_deref(), Some("visit 0"));
        assert_eq!(recent[1].reason.as_deref(), Some("visit 1"));
        assert_eq!(count_consultations(&conn, &patient.id).unwrap(), 4);
    }

    #[test]
    fn consultation_requires_existing_patient() {
        let conn = test_db();
        let orphan = Consultation {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            date: Utc::now(),
            reason: None,
            conclusion: None,
        };
        assert!(insert_consultation(&conn, &orphan).is_err());
    }

    #[test]
    fn documents_come_back_newest_first() {
        let conn = test_db();
        let patient = make_patient("Docs", None);
        insert_patient(&conn, &patient).unwrap();

        for i in 0..3 {
            insert_document(
                &conn,
                &Document {
                    id: Uuid::new_v4(),
                    patient_id: patient.id,
                    title: format!("doc {i}"),
                    doc_type: "scan".into(),
                    document_date: NaiveDate::from_ymd_opt(2025, 1, 1 + i),
                    created_at: Utc::now() - Duration::hours(i as i64),
                },
            )
            .unwrap();
        }

        let recent = recent_documents(&conn, &patient.id, 10).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].title, "doc 0");
        assert_eq!(count_documents(&conn, &patient.id).unwrap(), 3);
    }
}
