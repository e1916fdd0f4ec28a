// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Configuration surface (spec.md §6 "Configuration surface"), loaded
//! the way `agentreplay-server::config::ServerConfig` does: defaults,
//! optionally overridden by a TOML file, then overridden again by
//! environment variables where those are explicitly set. `samplingRate`
//! additionally honors an init-param override, giving the full
//! precedence chain spec.md §6 names: "init param > env var > config
//! file > 1.0".

use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `logLevel` (spec.md §6), mapped onto a `tracing_subscriber::EnvFilter`
/// directive by [`crate::logging::init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub(crate) fn as_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// `TUSK_DRIFT_MODE` (spec.md §6), mirrored by `tuskdrift_http::Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriftMode {
    Record,
    Replay,
    Disabled,
}

impl From<DriftMode> for tuskdrift_http::Mode {
    fn from(mode: DriftMode) -> Self {
        match mode {
            DriftMode::Record => tuskdrift_http::Mode::Record,
            DriftMode::Replay => tuskdrift_http::Mode::Replay,
            DriftMode::Disabled => tuskdrift_http::Mode::Disabled,
        }
    }
}

/// How to reach the CLI process — either a Unix socket path or a
/// host/port pair (spec.md §6: `TUSK_MOCK_SOCKET` or
/// `TUSK_MOCK_HOST`+`TUSK_MOCK_PORT`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MockConnTarget {
    Socket { socket: String },
    HostPort { host: String, port: u16 },
}

impl From<MockConnTarget> for tuskdrift_transport::ConnInfo {
    fn from(target: MockConnTarget) -> Self {
        match target {
            MockConnTarget::Socket { socket } => {
                tuskdrift_transport::ConnInfo::Unix(socket.into())
            }
            MockConnTarget::HostPort { host, port } => {
                tuskdrift_transport::ConnInfo::Tcp { host, port }
            }
        }
    }
}

/// The closed configuration surface from spec.md §6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuskConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_env")]
    pub env: String,

    #[serde(default)]
    pub log_level: Option<LogLevel>,

    #[serde(default)]
    pub sampling_rate: Option<f64>,

    #[serde(default)]
    pub transforms: Vec<tuskdrift_transform::RuleConfig>,

    #[serde(default)]
    pub mode: Option<DriftMode>,

    #[serde(default)]
    pub mock_conn: Option<MockConnTarget>,
}

fn default_env() -> String {
    "development".to_string()
}

impl TuskConfig {
    /// Load from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content =
            std::fs::read_to_string(path_ref).map_err(|source| SdkError::ConfigIo {
                path: path_ref.display().to_string(),
                source,
            })?;
        toml::from_str(&content).map_err(|source| SdkError::ConfigParse {
            path: path_ref.display().to_string(),
            source,
        })
    }

    /// Build straight from environment variables, starting from
    /// defaults (mirrors `ServerConfig::from_env`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("TUSK_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(env) = std::env::var("TUSK_ENV") {
            config.env = env;
        }
        if let Ok(mode) = std::env::var("TUSK_DRIFT_MODE") {
            config.mode = parse_mode(&mode);
        }
        if let Ok(rate) = std::env::var("TUSK_SAMPLING_RATE") {
            if let Ok(val) = rate.parse() {
                config.sampling_rate = Some(val);
            }
        }
        if let Ok(socket) = std::env::var("TUSK_MOCK_SOCKET") {
            config.mock_conn = Some(MockConnTarget::Socket { socket });
        } else if let (Ok(host), Ok(port)) = (
            std::env::var("TUSK_MOCK_HOST"),
            std::env::var("TUSK_MOCK_PORT"),
        ) {
            if let Ok(port) = port.parse() {
                config.mock_conn = Some(MockConnTarget::HostPort { host, port });
            }
        }

        config
    }

    /// File-or-default, then environment override — the precedence
    /// chain `ServerConfig::load` implements, minus the init-param tier
    /// which [`Self::with_sampling_rate_override`] applies on top.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!(path = %path.display(), "loading tuskdrift config from file");
                Self::from_file(path)?
            } else {
                tracing::warn!(path = %path.display(), "tuskdrift config file not found, using defaults");
                Self::default()
            }
        } else {
            Self::default()
        };

        config = Self::merge_with_env(config);
        Ok(config)
    }

    /// Only overrides a field if the corresponding env var was
    /// explicitly set — env outranks file/default but never fabricates
    /// a value that wasn't actually configured.
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();

        if std::env::var("TUSK_API_KEY").is_ok() {
            config.api_key = env_config.api_key;
        }
        if std::env::var("TUSK_ENV").is_ok() {
            config.env = env_config.env;
        }
        if std::env::var("TUSK_DRIFT_MODE").is_ok() {
            config.mode = env_config.mode;
        }
        if std::env::var("TUSK_SAMPLING_RATE").is_ok() {
            config.sampling_rate = env_config.sampling_rate;
        }
        if env_config.mock_conn.is_some() {
            config.mock_conn = env_config.mock_conn;
        }

        config
    }

    /// Resolves `samplingRate` with the full precedence chain spec.md
    /// §6 names: "init param > env var > config file > 1.0". `self` is
    /// assumed already merged with env (so its own `sampling_rate`
    /// covers both the env and file tiers); `init_override` is the
    /// caller's explicit constructor argument, if any.
    pub fn resolve_sampling_rate(&self, init_override: Option<f64>) -> f64 {
        init_override.or(self.sampling_rate).unwrap_or(1.0)
    }
}

fn parse_mode(raw: &str) -> Option<DriftMode> {
    match raw.to_ascii_uppercase().as_str() {
        "RECORD" => Some(DriftMode::Record),
        "REPLAY" => Some(DriftMode::Replay),
        "DISABLED" => Some(DriftMode::Disabled),
        _ => {
            tracing::warn!(value = raw, "unrecognized TUSK_DRIFT_MODE, ignoring");
            None
        }
    }
}
