use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A person who submitted the admissions form. One row per submission.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applicants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub first_name: String,
    pub last_name: String,
    #[sea_orm(indexed)]
    pub email: String,
    pub phone: String,
    pub id_number: String,
    pub date_of_birth: Date,
    pub gender: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,

    /// Set only by a successful email verification.
    #[sea_orm(default_value = false)]
    pub email_verified: bool,
    pub email_verified_at: Option<DateTimeUtc>,

    #[sea_orm(has_many)]
    pub applications: HasMany<super::application::Entity>,

    #[sea_orm(has_many)]
    pub files: HasMany<super::applicant_file::Entity>,

    #[sea_orm(has_many)]
    pub email_verifications: HasMany<super::email_verification::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
