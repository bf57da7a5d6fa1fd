//! Email verification tokens: issuing them inside the intake transaction and
//! consuming them from the emailed link.

use chrono::{Duration, Utc};
use common::{TokenHash, VerificationToken};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::entity::{applicant, email_verification};
use crate::models::verification::VerificationOutcome;

/// Store the hash of a fresh token for `applicant_id` and return the raw token.
///
/// Runs on the caller's connection so the row commits or rolls back together
/// with the application.
pub async fn issue_token<C: ConnectionTrait>(
    conn: &C,
    applicant_id: i32,
    ttl: Duration,
) -> Result<VerificationToken, DbErr> {
    let token = VerificationToken::generate();
    let now = Utc::now();

    email_verification::ActiveModel {
        applicant_id: Set(applicant_id),
        token_hash: Set(token.hash().into_string()),
        expires_at: Set(now + ttl),
        used_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(token)
}

/// Consume a raw token from a verification link.
///
/// Storage failures are logged and reported as [`VerificationOutcome::Failed`]
/// without detail.
#[instrument(skip_all)]
pub async fn verify_email(db: &DatabaseConnection, raw_token: &str) -> VerificationOutcome {
    let Some(hash) = TokenHash::from_untrusted(raw_token) else {
        return VerificationOutcome::Malformed;
    };

    match consume(db, &hash).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Email verification failed");
            VerificationOutcome::Failed
        }
    }
}

async fn consume(db: &DatabaseConnection, hash: &TokenHash) -> Result<VerificationOutcome, DbErr> {
    let txn = db.begin().await?;

    let Some(record) = email_verification::Entity::find()
        .filter(email_verification::Column::TokenHash.eq(hash.as_str()))
        .one(&txn)
        .await?
    else {
        return Ok(VerificationOutcome::NotFound);
    };

    if record.used_at.is_some() {
        return Ok(VerificationOutcome::AlreadyUsed);
    }

    let now = Utc::now();
    if record.expires_at < now {
        return Ok(VerificationOutcome::Expired);
    }

    // A concurrent request may have consumed the token since the read above.
    let consumed = email_verification::Entity::update_many()
        .col_expr(email_verification::Column::UsedAt, Expr::value(now))
        .filter(email_verification::Column::Id.eq(record.id))
        .filter(email_verification::Column::UsedAt.is_null())
        .exec(&txn)
        .await?;
    if consumed.rows_affected == 0 {
        return Ok(VerificationOutcome::AlreadyUsed);
    }

    let updated = applicant::Entity::update_many()
        .col_expr(applicant::Column::EmailVerified, Expr::value(true))
        .col_expr(applicant::Column::EmailVerifiedAt, Expr::value(now))
        .filter(applicant::Column::Id.eq(record.applicant_id))
        .exec(&txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(DbErr::RecordNotUpdated);
    }

    txn.commit().await?;

    info!(applicant_id = record.applicant_id, "Applicant email verified");
    Ok(VerificationOutcome::Verified)
}
