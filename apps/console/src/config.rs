use std::{fs, path::Path, time::Duration};

use client_core::{polling::MIN_POLL_INTERVAL, ConsoleOptions, DateDisplay, PollSettings};
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "trip_console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    /// 0 keeps polling until the trip settles.
    pub poll_timeout_secs: u64,
    pub notice_ttl_secs: u64,
    /// 0 disables the per-request timeout.
    pub request_timeout_secs: u64,
    pub date_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            poll_interval_ms: 2_000,
            poll_timeout_secs: 300,
            notice_ttl_secs: 5,
            request_timeout_secs: 30,
            date_format: client_core::view::DEFAULT_DATE_PATTERN.into(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn console_options(&self) -> ConsoleOptions {
        ConsoleOptions {
            poll: PollSettings {
                interval: self.poll_interval(),
                timeout: self.poll_timeout(),
            },
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
            dates: DateDisplay::new(self.date_format.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    poll_interval_ms: Option<u64>,
    poll_timeout_secs: Option<u64>,
    notice_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    date_format: Option<String>,
}

/// Defaults, then the settings file (if readable), then environment.
pub fn load_settings(path: &Path) -> Settings {
    let raw = fs::read_to_string(path).ok();
    resolve_settings(raw.as_deref(), |key| std::env::var(key).ok())
}

fn resolve_settings(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();
    if let Some(raw) = file {
        apply_file(&mut settings, raw);
    }
    apply_env(&mut settings, env);
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("config: ignoring unreadable {SETTINGS_FILE}: {err}");
            return;
        }
    };

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.poll_interval_ms {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = file_cfg.poll_timeout_secs {
        settings.poll_timeout_secs = v;
    }
    if let Some(v) = file_cfg.notice_ttl_secs {
        settings.notice_ttl_secs = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.date_format {
        settings.date_format = v;
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("TRIP_CONSOLE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    let numeric = |key: &str, target: &mut u64| {
        if let Some(v) = env(key) {
            match v.trim().parse::<u64>() {
                Ok(parsed) => *target = parsed,
                Err(_) => warn!("config: ignoring {key}={v}: not a number"),
            }
        }
    };
    numeric("APP__POLL_INTERVAL_MS", &mut settings.poll_interval_ms);
    numeric("APP__POLL_TIMEOUT_SECS", &mut settings.poll_timeout_secs);
    numeric("APP__NOTICE_TTL_SECS", &mut settings.notice_ttl_secs);
    numeric("APP__REQUEST_TIMEOUT_SECS", &mut settings.request_timeout_secs);

    if let Some(v) = env("APP__DATE_FORMAT") {
        settings.date_format = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
