use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};

use crate::entity::program;

/// Find the program for `(name, start_date)`, creating it when absent.
///
/// Relies on the unique index over both columns: a concurrent creator makes
/// our insert a no-op and the re-read returns its row.
pub async fn get_or_create_program<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    start_date: NaiveDate,
) -> Result<program::Model, DbErr> {
    if let Some(existing) = find_program(conn, name, start_date).await? {
        return Ok(existing);
    }

    let model = program::ActiveModel {
        name: Set(name.to_string()),
        start_date: Set(start_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = program::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([program::Column::Name, program::Column::StartDate])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    find_program(conn, name, start_date)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("program {name} ({start_date})")))
}

async fn find_program<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    start_date: NaiveDate,
) -> Result<Option<program::Model>, DbErr> {
    program::Entity::find()
        .filter(program::Column::Name.eq(name))
        .filter(program::Column::StartDate.eq(start_date))
        .one(conn)
        .await
}
