//! Post-commit side effects of an accepted application.
//!
//! Nothing here can fail a submission. Mail is retried with backoff and,
//! when every attempt fails, recorded in `notification_dead_letters`.

mod mailer;
mod templates;
mod whatsapp;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::retry::{RetryAttempt, RetryPolicy};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
use tracing::{error, info, instrument, warn};

pub use mailer::{HttpRelayMailer, LogMailer, MailError, Mailer};
pub use templates::{Email, escape_html};
pub use whatsapp::WhatsAppClient;

use crate::backup::{self, BackupRecord};
use crate::config::AppConfig;
use crate::entity::notification_dead_letter;
use crate::intake::PersistedApplication;
use crate::models::application::ApplicationForm;

/// What an undeliverable email was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ApplicantVerification,
    StaffSummary,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApplicantVerification => write!(f, "APPLICANT_VERIFICATION"),
            Self::StaffSummary => write!(f, "STAFF_SUMMARY"),
        }
    }
}

pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    whatsapp: Option<WhatsAppClient>,
    backup_path: Option<PathBuf>,
    policy: RetryPolicy,
    deadline: Duration,
    site_name: String,
    base_url: String,
    staff_address: String,
    ttl_minutes: i64,
}

impl Notifier {
    /// Build the production notifier. Without `mail.relay_url` mail is only logged.
    pub fn from_config(config: &AppConfig) -> Result<Self, MailError> {
        let timeout = Duration::from_secs(config.mail.timeout_secs);
        let mailer: Arc<dyn Mailer> = match &config.mail.relay_url {
            Some(url) if !url.is_empty() => Arc::new(HttpRelayMailer::new(
                url.clone(),
                config.mail.api_token.clone(),
                config.mail.from.clone(),
                timeout,
            )?),
            _ => {
                warn!("mail.relay_url not set, outgoing mail will only be logged");
                Arc::new(LogMailer)
            }
        };
        Self::with_mailer(config, mailer)
    }

    /// Build a notifier around an explicit transport.
    pub fn with_mailer(config: &AppConfig, mailer: Arc<dyn Mailer>) -> Result<Self, MailError> {
        let whatsapp = WhatsAppClient::from_config(
            &config.whatsapp,
            Duration::from_secs(config.mail.timeout_secs),
        )?;

        Ok(Self {
            mailer,
            whatsapp,
            backup_path: config.backup.csv_path.clone(),
            policy: RetryPolicy {
                max_retries: config.mail.max_retries,
                base_ms: config.mail.backoff_base_ms,
                max_ms: config.mail.backoff_max_ms,
            },
            deadline: Duration::from_millis(config.mail.deadline_ms),
            site_name: config.site.name.clone(),
            base_url: config.site.base_url.trim_end_matches('/').to_string(),
            staff_address: config.mail.staff_address.clone(),
            ttl_minutes: config.verification.ttl_minutes,
        })
    }

    /// Link the applicant follows to confirm their address.
    pub fn verification_link(&self, raw_token: &str) -> String {
        format!("{}/verify-email?token={raw_token}", self.base_url)
    }

    /// Run every post-commit side effect for a stored application.
    #[instrument(skip_all, fields(applicant_id = stored.applicant_id))]
    pub async fn application_received<C: ConnectionTrait>(
        &self,
        db: &C,
        form: &ApplicationForm,
        stored: &PersistedApplication,
    ) {
        let link = self.verification_link(stored.token.expose());
        let email = templates::verification_email(
            &self.site_name,
            &form.applicant.first_name,
            &link,
            self.ttl_minutes,
        );
        self.deliver(
            db,
            NotificationKind::ApplicantVerification,
            stored.applicant_id,
            &form.applicant.email,
            email,
        )
        .await;

        let summary = templates::staff_summary(&self.site_name, form, stored);
        self.deliver(
            db,
            NotificationKind::StaffSummary,
            stored.applicant_id,
            &self.staff_address,
            summary,
        )
        .await;

        if let Some(whatsapp) = &self.whatsapp {
            let text = templates::whatsapp_text(form, &stored.program_name);
            if let Err(e) = whatsapp.send_text(&text).await {
                warn!(error = %e, "WhatsApp notification failed");
            }
        }

        if let Some(path) = &self.backup_path {
            let record = BackupRecord::new(form, stored);
            if let Err(e) = backup::append(path.clone(), record).await {
                error!(path = %path.display(), error = %e, "CSV backup failed");
            }
        }
    }

    /// Send with retries inside the delivery deadline, then fall back to a
    /// dead letter.
    async fn deliver<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: NotificationKind,
        applicant_id: i32,
        to: &str,
        email: Email,
    ) {
        let mut history = Vec::new();
        let attempts = self.attempt_all(kind, to, &email, &mut history);
        let outcome = tokio::time::timeout(self.deadline, attempts).await;

        match outcome {
            Ok(true) => return,
            Ok(false) => {
                error!(%kind, attempts = history.len(), "Notification undeliverable, recording dead letter");
            }
            Err(_) => {
                let attempt = u8::try_from(history.len() + 1).unwrap_or(u8::MAX);
                history.push(RetryAttempt::new(attempt, "delivery deadline exceeded"));
                error!(
                    %kind,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Notification deadline exceeded, recording dead letter"
                );
            }
        }

        if let Err(e) = record_dead_letter(db, kind, applicant_id, to, &email.subject, &history).await
        {
            error!(%kind, error = %e, "Failed to record notification dead letter");
        }
    }

    /// Every attempt the retry policy allows. `true` once one succeeds.
    async fn attempt_all(
        &self,
        kind: NotificationKind,
        to: &str,
        email: &Email,
        history: &mut Vec<RetryAttempt>,
    ) -> bool {
        let total = self.policy.total_attempts();
        for attempt in 1..=total {
            match self.mailer.send(to, &email.subject, &email.html).await {
                Ok(()) => {
                    info!(%kind, attempt, "Notification sent");
                    return true;
                }
                Err(e) => {
                    warn!(%kind, attempt, total, error = %e, "Notification attempt failed");
                    history.push(RetryAttempt::new(attempt, e.to_string()));
                    if attempt < total {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }
        false
    }
}

async fn record_dead_letter<C: ConnectionTrait>(
    db: &C,
    kind: NotificationKind,
    applicant_id: i32,
    recipient: &str,
    subject: &str,
    history: &[RetryAttempt],
) -> Result<notification_dead_letter::Model, DbErr> {
    let error_message = history
        .last()
        .map(|a| a.error.clone())
        .unwrap_or_default();

    notification_dead_letter::ActiveModel {
        kind: Set(kind.to_string()),
        applicant_id: Set(Some(applicant_id)),
        recipient: Set(recipient.to_string()),
        subject: Set(subject.to_string()),
        error_message: Set(error_message),
        retry_count: Set(history.len() as i32),
        retry_history: Set(serde_json::to_value(history).unwrap_or_default()),
        created_at: Set(Utc::now()),
        resolved: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
}
