//! Application-level configuration loading: game rules, score sync tuning and the catalog source.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::dao::catalog::CatalogSource;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GUESS_PARTY_CONFIG_PATH";

/// Environment variable selecting the storage backend.
pub const STORE_BACKEND_ENV: &str = "STORE_BACKEND";

const DEFAULT_ROUND_DURATION_SECS: u32 = 60;
const DEFAULT_MAX_ROUNDS: u32 = 10;
const DEFAULT_LOW_WATER_MARK: usize = 5;
const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 2_000;
const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_SESSION_IDLE_SECS: u64 = 1_800;

/// Rules shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Length of a round in seconds.
    pub round_duration_secs: u32,
    /// Number of rounds after which the game ends.
    pub max_rounds: u32,
    /// The person pool is refilled at a round boundary when it holds fewer ids than this.
    pub low_water_mark: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            round_duration_secs: DEFAULT_ROUND_DURATION_SECS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
        }
    }
}

/// Timing of the pushes sending round scores to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period after which a pending push for a round is written.
    pub debounce: Duration,
    /// Upper bound on the round-boundary flush.
    pub flush_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_SYNC_DEBOUNCE_MS),
            flush_timeout: Duration::from_millis(DEFAULT_FLUSH_TIMEOUT_MS),
        }
    }
}

/// Storage backend holding the game records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// MongoDB `games` collection.
    Mongo,
    /// CouchDB database over HTTP.
    Couch,
    /// Process-local map, lost on restart.
    #[default]
    Memory,
}

/// The configured backend name is not one of `mongo`, `couch` or `memory`.
#[derive(Debug, Error)]
#[error("unknown storage backend `{0}` (expected mongo, couch or memory)")]
pub struct UnknownBackend(String);

impl FromStr for StoreBackend {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "couch" | "couchdb" => Ok(StoreBackend::Couch),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

impl StoreBackend {
    /// Read [`STORE_BACKEND_ENV`], defaulting to the in-memory store when unset.
    pub fn from_env() -> Result<Self, UnknownBackend> {
        match env::var(STORE_BACKEND_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(StoreBackend::default()),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: GameRules,
    sync: SyncSettings,
    catalog: CatalogSource,
    session_idle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            sync: SyncSettings::default(),
            catalog: CatalogSource::default(),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        round_duration_secs = app_config.rules.round_duration_secs,
                        max_rounds = app_config.rules.max_rounds,
                        catalog = ?app_config.catalog,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Build a configuration from explicit parts.
    pub fn new(rules: GameRules, sync: SyncSettings, catalog: CatalogSource) -> Self {
        Self {
            rules,
            sync,
            catalog,
            ..Self::default()
        }
    }

    /// Rules shared by every session.
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    /// Debounce and flush timing of score pushes.
    pub fn sync(&self) -> SyncSettings {
        self.sync
    }

    /// Where the person catalog comes from.
    pub fn catalog(&self) -> &CatalogSource {
        &self.catalog
    }

    /// Inactivity after which a session is dropped from memory.
    pub fn session_idle(&self) -> Duration {
        self.session_idle
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    round_duration_secs: Option<u32>,
    max_rounds: Option<u32>,
    low_water_mark: Option<usize>,
    sync_debounce_ms: Option<u64>,
    flush_timeout_ms: Option<u64>,
    session_idle_secs: Option<u64>,
    catalog: Option<CatalogSource>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = GameRules::default();
        let rules = GameRules {
            round_duration_secs: positive_or_default(
                "round_duration_secs",
                value.round_duration_secs,
                defaults.round_duration_secs,
            ),
            max_rounds: positive_or_default("max_rounds", value.max_rounds, defaults.max_rounds),
            low_water_mark: value.low_water_mark.unwrap_or(defaults.low_water_mark),
        };

        let sync_defaults = SyncSettings::default();
        let sync = SyncSettings {
            debounce: value
                .sync_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(sync_defaults.debounce),
            flush_timeout: value
                .flush_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(sync_defaults.flush_timeout),
        };

        Self {
            rules,
            sync,
            catalog: value.catalog.unwrap_or_default(),
            session_idle: value
                .session_idle_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_SESSION_IDLE_SECS)),
        }
    }
}

fn positive_or_default(field: &'static str, value: Option<u32>, default: u32) -> u32 {
    match value {
        Some(0) => {
            warn!(field, default, "configured value must be positive; using default");
            default
        }
        Some(value) => value,
        None => default,
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
