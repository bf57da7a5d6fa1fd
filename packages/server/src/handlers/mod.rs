pub mod application;
pub mod verification;
