pub mod config;
pub mod retry;
pub mod storage;
pub mod token;

pub use config::UploadConfig;
pub use token::{TokenHash, VerificationToken};
