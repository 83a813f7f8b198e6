use std::{fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::transport::{websocket::DEFAULT_EVENT_BUFFER, ReconnectPolicy};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
const CONFIG_FILE: &str = "modgen.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub backend_url: String,
    pub default_author: Option<String>,
    pub mc_version: Option<String>,
    pub reconnect: ReconnectPolicy,
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            default_author: None,
            mc_version: None,
            reconnect: ReconnectPolicy::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend_url: Option<String>,
    author: Option<String>,
    mc_version: Option<String>,
    reconnect_attempts: Option<u32>,
    reconnect_delay_ms: Option<u64>,
    reconnect_delay_max_ms: Option<u64>,
    event_buffer: Option<usize>,
}

pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();

    let path = std::env::var("MODGEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(&path) {
        apply_file(&mut settings, &raw);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(%err, "config: ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.backend_url {
        settings.backend_url = v;
    }
    if let Some(v) = file_cfg.author {
        settings.default_author = Some(v);
    }
    if let Some(v) = file_cfg.mc_version {
        settings.mc_version = Some(v);
    }
    if let Some(v) = file_cfg.reconnect_attempts {
        settings.reconnect.max_attempts = Some(v);
    }
    if let Some(v) = file_cfg.reconnect_delay_ms {
        settings.reconnect.delay = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.reconnect_delay_max_ms {
        settings.reconnect.max_delay = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.event_buffer {
        settings.event_buffer = v;
    }
}

pub(crate) fn apply_env(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = lookup("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = lookup("APP__DEFAULT_AUTHOR") {
        settings.default_author = Some(v);
    }
    if let Some(v) = lookup("APP__MC_VERSION") {
        settings.mc_version = Some(v);
    }

    if let Some(v) = lookup("APP__RECONNECT_ATTEMPTS") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.reconnect.max_attempts = Some(parsed);
        }
    }
    if let Some(v) = lookup("APP__RECONNECT_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.reconnect.delay = Duration::from_millis(parsed);
        }
    }
    if let Some(v) = lookup("APP__RECONNECT_DELAY_MAX_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.reconnect.max_delay = Duration::from_millis(parsed);
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
