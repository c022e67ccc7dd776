//! Client configuration.
//!
//! Read from `config.json` in the data directory. Every field has a default,
//! so a missing file or a partial one is fine. A few environment variables
//! override the file, and all cadences are clamped on load.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use linkpet::engine::{EngineConfig, SessionFlags};
use linkpet::sequencer::SequenceTiming;
use linkpet::snapshot::HatchRules;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::DriverConfig;

pub const ENV_API_URL: &str = "LINKPET_API_URL";
pub const ENV_USER_ID: &str = "LINKPET_USER_ID";
pub const ENV_LISTEN: &str = "LINKPET_LISTEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000/api/v1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_tick_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_sequence_ms() -> u64 {
    6_500
}

fn default_auto_claim() -> bool {
    true
}

fn default_listen_addr() -> String {
    "127.0.0.1:9877".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Sent as `X-User-ID` on every request.
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Ceiling for the retry delay after consecutive poll failures.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub hatch: HatchRules,
    /// Length of the hatch hand-off before navigating to naming.
    #[serde(default = "default_sequence_ms")]
    pub sequence_ms: u64,
    #[serde(default)]
    pub one_answer_per_session: bool,
    /// Claim an egg when there is none, or after one died.
    #[serde(default = "default_auto_claim")]
    pub auto_claim: bool,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_id: None,
            poll_interval_ms: default_poll_interval_ms(),
            tick_ms: default_tick_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            hatch: HatchRules::default(),
            sequence_ms: default_sequence_ms(),
            one_answer_per_session: false,
            auto_claim: default_auto_claim(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl ClientConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str::<ClientConfig>(&text).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => ClientConfig::default(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        cfg.validated()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(user) = lookup(ENV_USER_ID) {
            self.user_id = Some(user);
        }
        if let Some(addr) = lookup(ENV_LISTEN) {
            self.listen_addr = addr;
        }
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        let url = self.api_base_url.trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        self.api_base_url = url;
        if self.hatch.max_questions == 0 {
            return Err(ConfigError::Invalid {
                field: "hatch.max_questions",
                reason: "must be at least 1".to_string(),
            });
        }

        self.poll_interval_ms = self.poll_interval_ms.clamp(1_000, 600_000);
        self.tick_ms = self.tick_ms.clamp(100, 60_000);
        self.max_backoff_ms = self.max_backoff_ms.max(self.poll_interval_ms);
        self.request_timeout_ms = self.request_timeout_ms.clamp(500, 120_000);
        self.sequence_ms = self.sequence_ms.min(60_000);
        Ok(self)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let total = Duration::from_millis(self.sequence_ms);
        let defaults = SequenceTiming::default();
        EngineConfig {
            rules: self.hatch,
            timing: SequenceTiming {
                total,
                fade_start: defaults.fade_start.min(total),
                fade_len: defaults.fade_len,
            },
        }
    }

    pub fn session_flags(&self) -> SessionFlags {
        SessionFlags {
            one_answer_per_session: self.one_answer_per_session,
            answered_this_session: false,
        }
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            tick: Duration::from_millis(self.tick_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("linkpetd-config-does-not-exist.json");
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.poll_interval_ms, 5_000);
        assert_eq!(cfg.hatch, HatchRules::default());
        assert!(cfg.auto_claim);
    }

    #[test]
    fn partial_file_fills_defaults_and_clamps() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"poll_interval_ms": 10, "tick_ms": 5, "api_base_url": "http://pet.local/api/v1/"}"#)
                .unwrap();
        let cfg = cfg.validated().unwrap();
        assert_eq!(cfg.poll_interval_ms, 1_000);
        assert_eq!(cfg.tick_ms, 100);
        assert_eq!(cfg.api_base_url, "http://pet.local/api/v1");
        assert_eq!(cfg.listen_addr, "127.0.0.1:9877");
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = ClientConfig::default()
            .with_overrides(|key| match key {
                ENV_USER_ID => Some("42".to_string()),
                ENV_API_URL => Some("http://example.test/api/v1".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cfg.user_id.as_deref(), Some("42"));
        assert_eq!(cfg.api_base_url, "http://example.test/api/v1");
    }

    #[test]
    fn empty_api_url_is_rejected() {
        let err = ClientConfig::default()
            .with_overrides(|key| (key == ENV_API_URL).then(|| "  ".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "api_base_url", .. }));
    }

    #[test]
    fn backoff_ceiling_never_below_cadence() {
        let cfg = ClientConfig {
            poll_interval_ms: 20_000,
            max_backoff_ms: 1_000,
            ..ClientConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(cfg.max_backoff_ms, 20_000);
        assert_eq!(cfg.driver_config().poll_interval, Duration::from_secs(20));
    }
}
