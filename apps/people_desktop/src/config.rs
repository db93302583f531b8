use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use client_core::{ControllerSettings, DEFAULT_GROUP_ID, RESET_DATA_SOURCE};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "people.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub batch_group_id: String,
    pub reset_operation: String,
    pub texts_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/people.db".into(),
            batch_group_id: DEFAULT_GROUP_ID.into(),
            reset_operation: RESET_DATA_SOURCE.into(),
            texts_path: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            batch_group_id: self.batch_group_id.clone(),
            reset_operation: self.reset_operation.clone(),
        }
    }
}

/// Defaults, then the config file (if present), then environment variables.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    } else if config_path.is_some() {
        warn!(path = %path.display(), "config file not readable, using defaults");
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(error = %err, "ignoring malformed config file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("database_url") {
        settings.database_url = v.clone();
    }
    if let Some(v) = file_cfg.get("batch_group_id") {
        settings.batch_group_id = v.clone();
    }
    if let Some(v) = file_cfg.get("reset_operation") {
        settings.reset_operation = v.clone();
    }
    if let Some(v) = file_cfg.get("texts_path") {
        settings.texts_path = Some(PathBuf::from(v));
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

pub(crate) fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PEOPLE_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__BATCH_GROUP_ID") {
        settings.batch_group_id = v;
    }
    if let Some(v) = var("APP__RESET_OPERATION") {
        settings.reset_operation = v;
    }
    if let Some(v) = var("APP__TEXTS_PATH") {
        settings.texts_path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    let path = if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        path
    } else if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        path
    } else if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    } else {
        raw_database_url
    };

    let path = path.replace('\\', "/");
    if is_windows_absolute(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
