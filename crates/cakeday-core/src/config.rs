//! Configuration loaded from `~/.cakeday/config.toml`.
//!
//! Every field has a default so a missing file still yields a runnable
//! service. Deployment-time secrets usually come from the environment and
//! are layered on top with [`CakedayConfig::apply_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CakedayError, Result};

/// Cron expression used when `test_mode` is on.
pub const TEST_MODE_SCHEDULE: &str = "* * * * *";

const REDACTED: &str = "***";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CakedayConfig {
    /// IANA timezone that defines "today" for every record.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Five-field cron expression for the reminder pass.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Run the reminder pass every minute instead of `schedule`.
    #[serde(default)]
    pub test_mode: bool,
    /// Cap on concurrent sends within one pass.
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub holidays: HolidayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `sqlite` or `memory`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// `fcm`, `webhook`, or `log`.
    #[serde(default = "default_push_backend")]
    pub backend: String,
    /// Inline service-account JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Path to a service-account JSON file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_holiday_url")]
    pub api_url: String,
}

fn default_timezone() -> String { "Asia/Kolkata".into() }
fn default_schedule() -> String { "0 9 * * *".into() }
fn default_max_concurrent_sends() -> usize { 8 }
fn default_store_backend() -> String { "sqlite".into() }
fn default_store_path() -> String { "~/.cakeday/birthdays.db".into() }
fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 5000 }
fn default_push_backend() -> String { "fcm".into() }
fn default_request_timeout_secs() -> u64 { 10 }
fn default_smtp_port() -> u16 { 2525 }
fn default_country() -> String { "IN".into() }
fn default_holiday_url() -> String { "https://calendarific.com/api/v2/holidays".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            backend: default_push_backend(),
            service_account: None,
            service_account_path: None,
            webhook_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
        }
    }
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            country: default_country(),
            api_url: default_holiday_url(),
        }
    }
}

impl Default for CakedayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            schedule: default_schedule(),
            test_mode: false,
            max_concurrent_sends: default_max_concurrent_sends(),
            store: StoreConfig::default(),
            gateway: GatewayConfig::default(),
            push: PushConfig::default(),
            email: EmailConfig::default(),
            holidays: HolidayConfig::default(),
        }
    }
}

impl CakedayConfig {
    /// `~/.cakeday`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cakeday")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CakedayError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CakedayError::config(format!("serialize: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Layer process environment variables over the loaded values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(tz) = lookup("CAKEDAY_TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(flag) = lookup("TEST_MODE") {
            self.test_mode = flag == "true";
        }
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port
                .parse()
                .map_err(|_| CakedayError::config(format!("PORT is not a port number: {port}")))?;
        }
        if let Some(account) = lookup("FIREBASE_SERVICE_ACCOUNT") {
            self.push.service_account = Some(account);
        }
        if let Some(host) = lookup("SMTP_HOST") {
            self.email.smtp_host = Some(host);
        }
        if let Some(port) = lookup("SMTP_PORT") {
            self.email.smtp_port = port
                .parse()
                .map_err(|_| CakedayError::config(format!("SMTP_PORT is not a port number: {port}")))?;
        }
        if let Some(user) = lookup("SMTP_USERNAME") {
            self.email.username = Some(user);
        }
        if let Some(pass) = lookup("SMTP_PASSWORD") {
            self.email.password = Some(pass);
        }
        if let Some(key) = lookup("ALL_EVENT") {
            self.holidays.api_key = Some(key);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.max_concurrent_sends == 0 {
            return Err(CakedayError::config("max_concurrent_sends must be at least 1"));
        }
        Ok(())
    }

    /// Parsed timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| CakedayError::UnknownTimezone(self.timezone.clone()))
    }

    /// Schedule actually in force.
    pub fn effective_schedule(&self) -> &str {
        if self.test_mode {
            TEST_MODE_SCHEDULE
        } else {
            &self.schedule
        }
    }

    /// Copy with secret values masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |secret: &Option<String>| secret.as_ref().map(|_| REDACTED.to_string());
        let mut copy = self.clone();
        copy.push.service_account = mask(&self.push.service_account);
        copy.email.password = mask(&self.email.password);
        copy.holidays.api_key = mask(&self.holidays.api_key);
        copy
    }

    /// Store path with `~` expanded.
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store.path).to_string())
    }
}
