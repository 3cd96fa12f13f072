//! Configuration for the RSVP server.
//!
//! Built once at startup from the process environment (and an optional
//! `.env` file), then handed to each component's constructor.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Attendee database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Email provider configuration
    #[serde(default)]
    pub email: EmailConfig,

    /// WhatsApp provider configuration
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Settings shared by both providers
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Deployment environment. Controls the CORS allow-list and HSTS.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Runtime environment
    #[serde(default)]
    pub environment: Environment,

    /// Take the caller address from the last `X-Forwarded-For` hop
    #[serde(default = "default_true")]
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default = "empty_secret")]
    pub password: SecretString,

    #[serde(default = "default_db_name")]
    pub name: String,

    /// Maximum pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How long a request waits for a pooled connection before failing
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Brevo API key
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    #[serde(default = "default_email_url")]
    pub base_url: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Subject of the confirmation email
    #[serde(default = "default_subject")]
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API access token
    #[serde(default = "empty_secret")]
    pub access_token: SecretString,

    /// Sending phone number id
    #[serde(default)]
    pub phone_number_id: String,

    /// Pre-approved template name
    #[serde(default = "default_template_name")]
    pub template_name: String,

    #[serde(default = "default_language_code")]
    pub language_code: String,

    #[serde(default = "default_graph_url")]
    pub base_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Provider request timeout
    #[serde(default = "default_notification_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per caller across the whole API
    #[serde(default = "default_api_max")]
    pub api_max: u32,

    #[serde(default = "default_api_window", with = "humantime_serde")]
    pub api_window: Duration,

    /// Registrations per caller
    #[serde(default = "default_registration_max")]
    pub registration_max: u32,

    #[serde(default = "default_registration_window", with = "humantime_serde")]
    pub registration_window: Duration,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            environment: Environment::default(),
            trust_proxy: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: empty_secret(),
            name: default_db_name(),
            pool_size: default_pool_size(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: empty_secret(),
            base_url: default_email_url(),
            sender_name: default_sender_name(),
            sender_email: default_sender_email(),
            subject: default_subject(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: empty_secret(),
            phone_number_id: String::new(),
            template_name: default_template_name(),
            language_code: default_language_code(),
            base_url: default_graph_url(),
            api_version: default_api_version(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout: default_notification_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_max: default_api_max(),
            api_window: default_api_window(),
            registration_max: default_registration_max(),
            registration_window: default_registration_window(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Default value functions
fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3001
}

fn default_db_host() -> String {
    "localhost".into()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_user() -> String {
    "root".into()
}

fn default_db_name() -> String {
    "rsvp".into()
}

fn default_pool_size() -> u32 {
    25
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_email_url() -> String {
    notification_client::DEFAULT_BREVO_URL.into()
}

fn default_sender_name() -> String {
    "RSVP".into()
}

fn default_sender_email() -> String {
    "no-reply@example.com".into()
}

fn default_subject() -> String {
    "Confirmación de asistencia".into()
}

fn default_template_name() -> String {
    "confirmacion_asistencia".into()
}

fn default_language_code() -> String {
    "es".into()
}

fn default_graph_url() -> String {
    notification_client::DEFAULT_GRAPH_URL.into()
}

fn default_api_version() -> String {
    notification_client::DEFAULT_API_VERSION.into()
}

fn default_notification_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_api_max() -> u32 {
    150
}

fn default_api_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_registration_max() -> u32 {
    30
}

fn default_registration_window() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
