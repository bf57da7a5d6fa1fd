//! Transactional persistence of an accepted application.

mod program;
mod writer;

pub use program::get_or_create_program;
pub use writer::{PersistedApplication, StoredDocument, persist_application};
