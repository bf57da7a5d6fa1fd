use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub applicant_id: i32,
    #[sea_orm(belongs_to, from = "applicant_id", to = "id")]
    pub applicant: HasOne<super::applicant::Entity>,

    pub program_id: i32,
    #[sea_orm(belongs_to, from = "program_id", to = "id")]
    pub program: HasOne<super::program::Entity>,

    #[sea_orm(column_type = "Text")]
    pub motivation: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
