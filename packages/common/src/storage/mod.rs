mod error;
mod sniff;
mod upload;

pub use error::StorageError;
pub use sniff::{DocumentFormat, SNIFF_LEN};
pub use upload::{Placement, StagedUpload, StagingWriter, UploadStore, random_stored_name};
