use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An email that could not be delivered after all retries.
///
/// The body is deliberately not stored: verification mail carries the raw token.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_dead_letters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// APPLICANT_VERIFICATION or STAFF_SUMMARY
    #[sea_orm(indexed)]
    pub kind: String,

    #[sea_orm(indexed)]
    pub applicant_id: Option<i32>,

    pub recipient: String,
    pub subject: String,

    #[sea_orm(column_type = "Text")]
    pub error_message: String,

    pub retry_count: i32,

    /// Retry history as JSON array: [{attempt, error, timestamp}]
    #[sea_orm(column_type = "Json")]
    pub retry_history: serde_json::Value,

    pub created_at: DateTimeUtc,

    #[sea_orm(default_value = false, indexed)]
    pub resolved: bool,
}

impl ActiveModelBehavior for ActiveModel {}
