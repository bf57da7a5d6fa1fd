//! Append-only CSV copy of every committed application.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::intake::PersistedApplication;
use crate::models::application::ApplicationForm;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backup CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("backup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One CSV row. Field order is the column order.
#[derive(Debug, Serialize)]
pub struct BackupRecord {
    pub submitted_at: DateTime<Utc>,
    pub applicant_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub program: String,
    pub start_year: i32,
    pub popia_consent: bool,
    pub marketing_consent: bool,
    pub accuracy_consent: bool,
    /// Stored file names separated by `;`.
    pub files: String,
}

impl BackupRecord {
    pub fn new(form: &ApplicationForm, stored: &PersistedApplication) -> Self {
        Self {
            submitted_at: Utc::now(),
            applicant_id: stored.applicant_id,
            first_name: form.applicant.first_name.clone(),
            last_name: form.applicant.last_name.clone(),
            email: form.applicant.email.clone(),
            phone: form.applicant.phone.clone(),
            program: stored.program_name.clone(),
            start_year: stored.start_year,
            popia_consent: form.consents.popia,
            marketing_consent: form.consents.marketing,
            accuracy_consent: form.consents.accuracy,
            files: stored
                .documents
                .iter()
                .map(|d| d.stored_name.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Append `record` on a blocking thread.
pub async fn append(path: PathBuf, record: BackupRecord) -> Result<(), BackupError> {
    tokio::task::spawn_blocking(move || append_blocking(&path, &record)).await?
}

fn append_blocking(path: &Path, record: &BackupRecord) -> Result<(), BackupError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}
