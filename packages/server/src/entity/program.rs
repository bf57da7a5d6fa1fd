use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An intake: a course name tied to its start date.
///
/// `(name, start_date)` is unique; the index is created in
/// [`crate::database::ensure_indexes`].
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "programs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    /// First day of the intake year.
    pub start_date: Date,

    #[sea_orm(has_many)]
    pub applications: HasMany<super::application::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
