use chrono::{Datelike, Utc};
use common::UploadConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Public-facing site settings used in links and redirects.
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub name: String,
    /// Absolute origin used to build verification links, without trailing slash.
    pub base_url: String,
    /// Redirect target after a successful plain form post.
    pub success_page: String,
    /// Redirect target after a failed plain form post.
    pub failure_page: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IntakeConfig {
    /// Start years an applicant may choose. Empty means the current and the
    /// next calendar year.
    #[serde(default)]
    pub start_years: Vec<i32>,
}

impl IntakeConfig {
    pub fn allowed_start_years(&self) -> Vec<i32> {
        if self.start_years.is_empty() {
            let year = Utc::now().year();
            vec![year, year + 1]
        } else {
            self.start_years.clone()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Lifetime of a verification link. Default: 45.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

fn default_ttl_minutes() -> i64 {
    45
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// HTTP mail relay endpoint. When absent, mail is only logged.
    pub relay_url: Option<String>,
    /// Bearer token for the relay.
    pub api_token: Option<String>,
    pub from: String,
    /// Admissions inbox receiving the per-application summary.
    pub staff_address: String,
    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_mail_max_retries")]
    pub max_retries: u8,
    #[serde(default = "default_mail_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_mail_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Budget for all attempts at one email, backoff included.
    #[serde(default = "default_mail_deadline_ms")]
    pub deadline_ms: u64,
}

fn default_mail_timeout_secs() -> u64 {
    5
}
fn default_mail_max_retries() -> u8 {
    2
}
fn default_mail_backoff_base_ms() -> u64 {
    250
}
fn default_mail_backoff_max_ms() -> u64 {
    2000
}
fn default_mail_deadline_ms() -> u64 {
    10_000
}

/// WhatsApp Cloud API credentials. Pings are skipped unless all three are set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WhatsAppConfig {
    pub token: Option<String>,
    pub phone_number_id: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackupConfig {
    /// Append every committed application to this CSV file.
    pub csv_path: Option<std::path::PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("site.name", "Roguda Fashion & Art Design School")?
            .set_default("site.base_url", "http://127.0.0.1:3000")?
            .set_default("site.success_page", "/apply-success.html")?
            .set_default("site.failure_page", "/apply-failed.html")?
            .set_default("mail.from", "admissions@localhost")?
            .set_default("mail.staff_address", "admissions@localhost")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ADMISSIONS__DATABASE__URL)
            .add_source(
                Environment::with_prefix("ADMISSIONS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .with_list_parse_key("intake.start_years")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
