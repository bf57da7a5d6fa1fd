use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-use email verification token. Only the SHA-256 of the raw token is stored.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_verifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub applicant_id: i32,
    #[sea_orm(belongs_to, from = "applicant_id", to = "id")]
    pub applicant: HasOne<super::applicant::Entity>,

    #[sea_orm(unique)]
    pub token_hash: String,

    pub expires_at: DateTimeUtc,
    /// NULL until consumed. Never cleared once set.
    pub used_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
