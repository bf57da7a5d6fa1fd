pub mod applicant;
pub mod applicant_file;
pub mod application;
pub mod consent;
pub mod education;
pub mod email_verification;
pub mod notification_dead_letter;
pub mod program;
