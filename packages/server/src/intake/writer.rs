use chrono::{Duration, Utc};
use common::VerificationToken;
use common::storage::{UploadStore, random_stored_name};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use tracing::{info, instrument};

use super::program::get_or_create_program;
use crate::entity::{applicant, applicant_file, application, consent, education};
use crate::error::AppError;
use crate::models::application::ApplicationForm;
use crate::models::documents::ValidatedDocuments;
use crate::verification::issue_token;

/// A document as it now sits in the applicant directory.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub file_type: &'static str,
    pub stored_name: String,
}

/// Everything the post-commit side effects need.
#[derive(Debug)]
pub struct PersistedApplication {
    pub applicant_id: i32,
    pub application_id: i32,
    pub program_name: String,
    pub start_year: i32,
    pub documents: Vec<StoredDocument>,
    pub token: VerificationToken,
}

/// Write the whole application in one transaction.
///
/// Documents move from staging into `{uploads.root}/{applicant_id}/` after
/// all rows are inserted. If anything fails before the commit, the
/// transaction rolls back on drop and the placement removes the moved files
/// and the directory it created.
#[instrument(skip_all, fields(program = %form.program, start_year = form.start_year))]
pub async fn persist_application(
    db: &DatabaseConnection,
    uploads: &UploadStore,
    form: &ApplicationForm,
    documents: ValidatedDocuments,
    token_ttl: Duration,
) -> Result<PersistedApplication, AppError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let details = &form.applicant;
    let applicant = applicant::ActiveModel {
        first_name: Set(details.first_name.clone()),
        last_name: Set(details.last_name.clone()),
        email: Set(details.email.clone()),
        phone: Set(details.phone.clone()),
        id_number: Set(details.id_number.clone()),
        date_of_birth: Set(details.date_of_birth),
        gender: Set(details.gender.clone()),
        address: Set(details.address.clone()),
        email_verified: Set(false),
        email_verified_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let program = get_or_create_program(&txn, &form.program, form.program_start_date()).await?;

    let application = application::ActiveModel {
        applicant_id: Set(applicant.id),
        program_id: Set(program.id),
        motivation: Set(form.motivation.clone()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let edu = &form.education;
    education::ActiveModel {
        applicant_id: Set(applicant.id),
        level: Set(edu.level.clone()),
        institution: Set(edu.institution.clone()),
        graduation_year: Set(edu.graduation_year),
        portfolio_url: Set(edu.portfolio_url.clone()),
        experience: Set(edu.experience.clone()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    consent::ActiveModel {
        applicant_id: Set(applicant.id),
        popia: Set(form.consents.popia),
        marketing: Set(form.consents.marketing),
        accuracy: Set(form.consents.accuracy),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let documents = documents.into_inner();
    let mut pending = Vec::with_capacity(documents.len());
    for doc in documents {
        let file_type = doc.slot.file_type();
        let stored_name = random_stored_name(file_type, doc.format);

        applicant_file::ActiveModel {
            applicant_id: Set(applicant.id),
            file_type: Set(file_type.to_string()),
            stored_name: Set(stored_name.clone()),
            original_name: Set(doc.upload.original_name().chars().take(255).collect()),
            mime_type: Set(doc.format.mime().to_string()),
            size: Set(i64::try_from(doc.upload.size()).unwrap_or(i64::MAX)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        pending.push((doc.upload, file_type, stored_name));
    }

    let token = issue_token(&txn, applicant.id, token_ttl).await?;

    let mut placement = uploads.placement(applicant.id);
    let mut stored = Vec::with_capacity(pending.len());
    for (upload, file_type, stored_name) in pending {
        placement.place(upload, &stored_name).await?;
        stored.push(StoredDocument {
            file_type,
            stored_name,
        });
    }

    txn.commit().await?;
    placement.commit();

    info!(
        applicant_id = applicant.id,
        application_id = application.id,
        program_id = program.id,
        files = stored.len(),
        "Application stored"
    );

    Ok(PersistedApplication {
        applicant_id: applicant.id,
        application_id: application.id,
        program_name: program.name,
        start_year: form.start_year,
        documents: stored,
        token,
    })
}
