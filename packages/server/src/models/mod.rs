pub mod application;
pub mod documents;
pub mod verification;
