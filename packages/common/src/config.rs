use std::path::PathBuf;

use serde::Deserialize;

/// Where application documents live and how large they may be.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Root of the per-applicant directories. Default: "uploads/applications".
    #[serde(default = "default_upload_root")]
    pub root: PathBuf,
    /// Scratch directory for parts still being received. Must not live under `root`.
    /// Default: "uploads/.staging".
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Per-file ceiling in bytes. Default: 8 MiB.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_upload_root() -> PathBuf {
    PathBuf::from("uploads/applications")
}
fn default_staging_dir() -> PathBuf {
    PathBuf::from("uploads/.staging")
}
fn default_max_file_size() -> u64 {
    8 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: default_upload_root(),
            staging_dir: default_staging_dir(),
            max_file_size: default_max_file_size(),
        }
    }
}
