use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::error::StorageError;
use super::sniff::{DocumentFormat, SNIFF_LEN};
use crate::config::UploadConfig;

/// Filesystem store for application documents.
///
/// Parts are first written to `staging_dir` while the request is still being
/// read. Only after the form is accepted are they moved to
/// `{root}/{applicant_id}/{stored_name}` through a [`Placement`].
pub struct UploadStore {
    root: PathBuf,
    staging_dir: PathBuf,
    max_file_size: u64,
}

impl UploadStore {
    /// Create the store, making sure both directories exist.
    pub async fn new(config: &UploadConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.root).await?;
        fs::create_dir_all(&config.staging_dir).await?;
        Ok(Self {
            root: config.root.clone(),
            staging_dir: config.staging_dir.clone(),
            max_file_size: config.max_file_size,
        })
    }

    /// Directory holding one applicant's documents.
    pub fn applicant_dir(&self, applicant_id: i32) -> PathBuf {
        self.root.join(applicant_id.to_string())
    }

    /// Open a staging file for an incoming part.
    pub async fn begin_staging(&self, original_name: &str) -> Result<StagingWriter, StorageError> {
        let path = self
            .staging_dir
            .join(format!("{}.part", uuid::Uuid::new_v4()));
        let file = fs::File::create(&path).await?;

        Ok(StagingWriter {
            file,
            upload: StagedUpload {
                path,
                original_name: original_name.to_string(),
                size: 0,
                header: Vec::with_capacity(SNIFF_LEN),
                consumed: false,
            },
            limit: self.max_file_size,
        })
    }

    /// Start placing documents for a freshly inserted applicant.
    pub fn placement(&self, applicant_id: i32) -> Placement {
        Placement {
            dir: self.applicant_dir(applicant_id),
            placed: Vec::new(),
            created_dir: false,
            committed: false,
        }
    }
}

/// Writes one multipart part to the staging directory, enforcing the size
/// ceiling as bytes arrive.
pub struct StagingWriter {
    file: fs::File,
    upload: StagedUpload,
    limit: u64,
}

impl StagingWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let actual = self.upload.size + chunk.len() as u64;
        if actual > self.limit {
            return Err(StorageError::SizeLimitExceeded {
                actual,
                limit: self.limit,
            });
        }

        if self.upload.header.len() < SNIFF_LEN {
            let wanted = SNIFF_LEN - self.upload.header.len();
            self.upload
                .header
                .extend_from_slice(&chunk[..wanted.min(chunk.len())]);
        }

        self.file.write_all(chunk).await?;
        self.upload.size = actual;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StagedUpload, StorageError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(self.upload)
    }
}

/// A fully received part waiting in the staging directory.
///
/// Dropping it without placing it deletes the staging file.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    original_name: String,
    size: u64,
    header: Vec<u8>,
    consumed: bool,
}

impl StagedUpload {
    /// Filename as sent by the client. Never used to build a path.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercased extension of the client filename, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Format detected from the leading bytes.
    pub fn sniffed(&self) -> Option<DocumentFormat> {
        DocumentFormat::sniff(&self.header)
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.consumed {
            // Best effort.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Moves staged documents into an applicant directory and undoes the moves
/// unless [`Placement::commit`] is called.
pub struct Placement {
    dir: PathBuf,
    placed: Vec<PathBuf>,
    created_dir: bool,
    committed: bool,
}

impl Placement {
    /// Move a staged upload to `{dir}/{stored_name}`.
    pub async fn place(
        &mut self,
        mut upload: StagedUpload,
        stored_name: &str,
    ) -> Result<PathBuf, StorageError> {
        if !self.created_dir && !fs::try_exists(&self.dir).await? {
            fs::create_dir_all(&self.dir).await?;
            self.created_dir = true;
        }

        let dest = self.dir.join(stored_name);
        move_file(&upload.path, &dest).await?;
        upload.consumed = true;
        self.placed.push(dest.clone());

        Ok(dest)
    }

    /// Keep the placed files. Call only after the database commit succeeded.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Placement {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.placed {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove orphaned upload");
            }
        }
        if self.created_dir {
            let _ = std::fs::remove_dir(&self.dir);
        }
    }
}

/// Rename, falling back to copy + delete when staging and root are on
/// different filesystems.
///
/// On error `to` does not exist, so a failed move leaves nothing for the
/// placement to track.
async fn move_file(from: &Path, to: &Path) -> Result<(), StorageError> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    if let Err(e) = copy_then_remove(from, to).await {
        match fs::remove_file(to).await {
            Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                warn!(path = %to.display(), error = %cleanup, "Failed to remove partial upload copy");
            }
            _ => {}
        }
        return Err(e);
    }
    Ok(())
}

async fn copy_then_remove(from: &Path, to: &Path) -> Result<(), StorageError> {
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}

/// `{tag}_{16 random hex chars}.{ext}`, the on-disk name of a document.
pub fn random_stored_name(tag: &str, format: DocumentFormat) -> String {
    let suffix: [u8; 8] = rand::random();
    format!("{tag}_{}.{}", hex::encode(suffix), format.extension())
}
