//! Configuration loading from environment variables.

use crate::constants::{DEFAULT_MAX_ID_ATTEMPTS, DEFAULT_MAX_PASTE_SIZE, DEFAULT_PORT};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which store adapter backs the service. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable embedded database on disk.
    #[default]
    Redb,
    /// Process-local store; contents vanish on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redb" | "disk" => Ok(Self::Redb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Runtime configuration for the pastebin.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub max_paste_size: usize,
    pub storage_backend: StorageBackend,
    /// Seconds between background expiry sweeps; `0` disables the sweep.
    pub sweep_interval_secs: u64,
    pub max_id_attempts: usize,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn default_db_path() -> String {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cache")
        .join("pastebin")
        .join("db")
        .to_string_lossy()
        .to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> Option<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let storage_backend = match parsed("STORAGE_BACKEND") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("{}; falling back to {}", err, StorageBackend::default());
                StorageBackend::default()
            }),
            None => StorageBackend::default(),
        };

        Self {
            db_path: parsed("DB_PATH")
                .map(expand_tilde)
                .unwrap_or_else(default_db_path),
            port: parse_or_default(parsed("PORT"), "PORT", DEFAULT_PORT),
            max_paste_size: parse_or_default(
                parsed("MAX_PASTE_SIZE"),
                "MAX_PASTE_SIZE",
                DEFAULT_MAX_PASTE_SIZE,
            )
            .max(1),
            storage_backend,
            sweep_interval_secs: parse_or_default(
                parsed("SWEEP_INTERVAL_SECS"),
                "SWEEP_INTERVAL_SECS",
                0,
            ),
            max_id_attempts: parse_or_default(
                parsed("MAX_ID_ATTEMPTS"),
                "MAX_ID_ATTEMPTS",
                DEFAULT_MAX_ID_ATTEMPTS,
            )
            .max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or_default<T>(raw: Option<String>, name: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("Invalid {}='{}'; using default {}", name, raw, default);
            default
        }
    }
}
