use axum::Json;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use common::storage::{StagedUpload, StorageError, UploadStore};
use tracing::{error, info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::response_mode::ResponseMode;
use crate::intake::persist_application;
use crate::models::application::{
    ConsentField, FormRules, RawApplicationFields, SubmissionResponse, TextField,
};
use crate::models::documents::{DocumentSlot, ReceivedDocuments};
use crate::state::AppState;

const MIB: u64 = 1024 * 1024;

const SUBMITTED: &str =
    "Application submitted successfully. Please check your email to confirm your address.";

/// Three documents at the size ceiling plus room for the text fields.
pub fn application_body_limit(max_file_size: u64) -> DefaultBodyLimit {
    let limit = max_file_size.saturating_mul(3).saturating_add(MIB);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Applications",
    operation_id = "submitApplication",
    summary = "Submit an admissions application",
    description = "Accepts the public application form as `multipart/form-data`. Text fields: \
        `firstName`, `lastName`, `email`, `phone`, `idNumber`, `dob`, `gender`, `address`, \
        `program`, `startDate`, `motivation`, `education`, `school`, `graduationYear`, \
        `portfolio`, `experience`. Checkboxes (presence means checked): `popiaConsent`, \
        `accuracyConsent` (both required), `marketingConsent`. Files: `idCopy` (required), \
        `certificate`, `portfolioFile`; PDF, JPEG or PNG, detected from content. \
        Clients sending `Accept: application/json` or `X-Requested-With: XMLHttpRequest` get \
        JSON; plain form posts are redirected with 303 to the success or failure page.",
    request_body(content_type = "multipart/form-data", description = "Application form"),
    responses(
        (status = 201, description = "Application stored, verification email sent", body = SubmissionResponse),
        (status = 303, description = "Plain form post, redirect to the outcome page"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File or request too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn submit_application(
    mode: ResponseMode,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(multipart) => process(&state, multipart).await,
        Err(rejection) => Err(AppError::Validation(format!(
            "Malformed form submission: {}",
            rejection.body_text()
        ))),
    };

    match (result, mode) {
        (Ok(()), ResponseMode::Json) => (
            StatusCode::CREATED,
            Json(SubmissionResponse {
                success: true,
                message: SUBMITTED.into(),
            }),
        )
            .into_response(),
        (Ok(()), ResponseMode::Redirect) => see_other(&state.config.site.success_page),
        (Err(err), ResponseMode::Json) => err.into_response(),
        (Err(err), ResponseMode::Redirect) => {
            match &err {
                AppError::Internal(detail) => error!("Internal error: {}", detail),
                other => info!(reason = ?other, "Application rejected"),
            }
            see_other(&state.config.site.failure_page)
        }
    }
}

async fn process(state: &AppState, multipart: Multipart) -> Result<(), AppError> {
    let (fields, documents) = read_submission(&state.uploads, multipart).await?;

    let rules = FormRules {
        start_years: state.config.intake.allowed_start_years(),
        today: Utc::now().date_naive(),
    };
    let form = fields.normalize(&rules)?;
    let documents = documents.validate()?;

    let ttl = Duration::minutes(state.config.verification.ttl_minutes);
    let stored = persist_application(&state.db, &state.uploads, &form, documents, ttl).await?;

    state
        .notifier
        .application_received(&state.db, &form, &stored)
        .await;

    Ok(())
}

/// Walk the multipart stream once. Documents are streamed to staging as they
/// arrive; anything returned early drops the staged files with it.
async fn read_submission(
    uploads: &UploadStore,
    mut multipart: Multipart,
) -> Result<(RawApplicationFields, ReceivedDocuments), AppError> {
    let mut fields = RawApplicationFields::default();
    let mut documents = ReceivedDocuments::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(slot) = DocumentSlot::from_name(&name) {
            let original_name = field.file_name().unwrap_or_default().to_string();
            let upload = stage_document(uploads, slot, &original_name, field).await?;
            // An unselected file input arrives as an empty, unnamed part.
            if original_name.is_empty() && upload.size() == 0 {
                continue;
            }
            documents.insert(slot, upload)?;
        } else if let Some(text_field) = TextField::from_name(&name) {
            let value = field.text().await.map_err(multipart_error)?;
            fields.set_text(text_field, value)?;
        } else if let Some(consent) = ConsentField::from_name(&name) {
            field.bytes().await.map_err(multipart_error)?;
            fields.check(consent)?;
        } else {
            return Err(AppError::Validation(format!("Unexpected form field: {name}")));
        }
    }

    Ok((fields, documents))
}

async fn stage_document(
    uploads: &UploadStore,
    slot: DocumentSlot,
    original_name: &str,
    mut field: Field<'_>,
) -> Result<StagedUpload, AppError> {
    let mut writer = uploads.begin_staging(original_name).await?;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        writer.write_chunk(&chunk).await.map_err(|e| match e {
            StorageError::SizeLimitExceeded { limit, .. } => AppError::PayloadTooLarge(format!(
                "File too large for {} (max {}MB)",
                slot.field_name(),
                limit / MIB
            )),
            other => other.into(),
        })?;
    }

    Ok(writer.finish().await?)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request too large.".into())
    } else {
        AppError::Validation(format!("Malformed form submission: {}", err.body_text()))
    }
}

fn see_other(location: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())]).into_response()
}
