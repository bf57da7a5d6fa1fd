use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{email_verification, program};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("admissions::entity::*")
        .sync(&db)
        .await?;
    ensure_indexes(&db).await?;

    Ok(db)
}

/// Ensure the composite indexes schema-sync cannot express.
///
/// The program index is load-bearing: get-or-create relies on it to turn a
/// concurrent duplicate insert into a no-op, so failure here aborts startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_programs_name_start_date")
        .table(program::Entity)
        .col(program::Column::Name)
        .col(program::Column::StartDate)
        .to_owned();
    db.execute_raw(backend.build(&stmt)).await?;
    info!("Ensured index idx_programs_name_start_date exists");

    // Lookup by applicant when listing or cleaning up tokens.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_email_verifications_applicant")
        .table(email_verification::Entity)
        .col(email_verification::Column::ApplicantId)
        .to_owned();
    if let Err(e) = db.execute_raw(backend.build(&stmt)).await {
        tracing::warn!(
            "Failed to create index idx_email_verifications_applicant: {}",
            e
        );
    }

    Ok(())
}
