use common::storage::{DocumentFormat, StagedUpload};
use thiserror::Error;

use crate::error::AppError;

/// The three document inputs of the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSlot {
    IdCopy,
    Certificate,
    Portfolio,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 3] = [Self::IdCopy, Self::Certificate, Self::Portfolio];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "idCopy" => Some(Self::IdCopy),
            "certificate" => Some(Self::Certificate),
            "portfolioFile" => Some(Self::Portfolio),
            _ => None,
        }
    }

    /// Multipart field name.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::IdCopy => "idCopy",
            Self::Certificate => "certificate",
            Self::Portfolio => "portfolioFile",
        }
    }

    /// Value stored in `applicant_files.file_type` and used as stored-name prefix.
    pub fn file_type(self) -> &'static str {
        match self {
            Self::IdCopy => "id_copy",
            Self::Certificate => "certificate",
            Self::Portfolio => "portfolio",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please upload a copy of your ID.")]
    MissingIdCopy,
    #[error("Upload failed for {0}")]
    Empty(&'static str),
    #[error("Invalid file type for {0}")]
    InvalidType(&'static str),
    #[error("Only one file may be uploaded for {0}")]
    Duplicate(&'static str),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Staged parts collected from the multipart stream, not yet checked.
#[derive(Debug, Default)]
pub struct ReceivedDocuments {
    id_copy: Option<StagedUpload>,
    certificate: Option<StagedUpload>,
    portfolio: Option<StagedUpload>,
}

impl ReceivedDocuments {
    fn slot(&mut self, slot: DocumentSlot) -> &mut Option<StagedUpload> {
        match slot {
            DocumentSlot::IdCopy => &mut self.id_copy,
            DocumentSlot::Certificate => &mut self.certificate,
            DocumentSlot::Portfolio => &mut self.portfolio,
        }
    }

    pub fn insert(&mut self, slot: DocumentSlot, upload: StagedUpload) -> Result<(), UploadError> {
        let entry = self.slot(slot);
        if entry.is_some() {
            return Err(UploadError::Duplicate(slot.field_name()));
        }
        *entry = Some(upload);
        Ok(())
    }

    /// Check every present document. The ID copy is mandatory.
    ///
    /// Size ceilings are enforced earlier, while the part is streamed to
    /// staging.
    pub fn validate(mut self) -> Result<ValidatedDocuments, UploadError> {
        if self.id_copy.is_none() {
            return Err(UploadError::MissingIdCopy);
        }

        let mut accepted = Vec::with_capacity(DocumentSlot::ALL.len());
        for slot in DocumentSlot::ALL {
            if let Some(upload) = self.slot(slot).take() {
                let format = check(slot, &upload)?;
                accepted.push(ValidatedDocument {
                    slot,
                    format,
                    upload,
                });
            }
        }
        Ok(ValidatedDocuments(accepted))
    }
}

fn check(slot: DocumentSlot, upload: &StagedUpload) -> Result<DocumentFormat, UploadError> {
    let name = slot.field_name();
    if upload.size() == 0 {
        return Err(UploadError::Empty(name));
    }

    // Extension and content need not agree; both must be on the allow-list.
    upload
        .extension()
        .and_then(|ext| DocumentFormat::from_extension(&ext))
        .ok_or(UploadError::InvalidType(name))?;

    // The client-declared content type is ignored; only the bytes count.
    upload.sniffed().ok_or(UploadError::InvalidType(name))
}

/// A document that passed validation, still sitting in staging.
#[derive(Debug)]
pub struct ValidatedDocument {
    pub slot: DocumentSlot,
    /// Detected from content. Decides the stored extension and MIME type.
    pub format: DocumentFormat,
    pub upload: StagedUpload,
}

#[derive(Debug)]
pub struct ValidatedDocuments(Vec<ValidatedDocument>);

impl ValidatedDocuments {
    pub fn into_inner(self) -> Vec<ValidatedDocument> {
        self.0
    }
}
