use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applicant_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub applicant_id: i32,
    #[sea_orm(belongs_to, from = "applicant_id", to = "id")]
    pub applicant: HasOne<super::applicant::Entity>,

    /// One of: id_copy, certificate, portfolio
    pub file_type: String,
    /// Name inside `uploads/applications/{applicant_id}/`.
    pub stored_name: String,
    /// Client filename, kept for staff reference only.
    pub original_name: String,
    /// Sniffed MIME type.
    pub mime_type: String,
    pub size: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
