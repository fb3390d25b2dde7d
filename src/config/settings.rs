use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::poll::ReplayPolicy;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

const ENV_CONFIG_PATH: &str = "UI_POLL_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How a polling loop paces itself and how its deferred requests replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause after each polling round (None = no pause)
    pub interval: Option<Duration>,
    /// Host loop iterations per polling round
    pub iterations: usize,
    /// Replay behavior for aborted requests
    pub replay: ReplayPolicy,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_millis(20)),
            iterations: 1,
            replay: ReplayPolicy::default(),
        }
    }
}

impl PollOptions {
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_replay(mut self, replay: ReplayPolicy) -> Self {
        self.replay = replay;
        self
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub poll: PollOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlPollConfig {
    pub interval_ms: Option<u64>,
    pub iterations: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlReplayConfig {
    pub on_abort: Option<ReplayPolicy>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub poll: Option<TomlPollConfig>,
    pub replay: Option<TomlReplayConfig>,
}

impl Config {
    /// Load from `$UI_POLL_CONFIG` or the default location.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is logged
    /// and also yields defaults.
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Config::default();
        }
        match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                Config::default()
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let toml_config: TomlConfig = toml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(poll) = toml_config.poll {
            if let Some(interval_ms) = poll.interval_ms {
                config.poll.interval =
                    (interval_ms > 0).then(|| Duration::from_millis(interval_ms));
            }
            if let Some(iterations) = poll.iterations {
                config.poll.iterations = iterations;
            }
        }

        if let Some(replay) = toml_config.replay {
            if let Some(on_abort) = replay.on_abort {
                config.poll.replay = on_abort;
            }
        }

        Ok(config)
    }
}

/// Path of the config file: `$UI_POLL_CONFIG`, else `<config dir>/ui-poll/config.toml`.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(ENV_CONFIG_PATH) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("ui-poll").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("ui-poll.toml"))
}
