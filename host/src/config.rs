// Host configuration: the game settings plus which oracle backend to use.
//
// Loaded from a JSON file; every field has a default so a partial file (or no
// file at all) works. The remote API key may also come from `QFLEET_API_KEY`
// so it does not have to live in the file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use qfleet_core::{GameConfig, LocalOracle, RandomOracle};
use serde::{Deserialize, Serialize};

use crate::remote_oracle::RemoteOracle;

pub const API_KEY_ENV: &str = "QFLEET_API_KEY";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum OracleConfig {
    Local {
        #[serde(default)]
        seed: Option<u64>,
    },
    Remote {
        address: String,
        #[serde(default)]
        api_key: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig::Local { seed: None }
    }
}

impl OracleConfig {
    pub fn remote(address: impl Into<String>, api_key: impl Into<String>) -> Self {
        OracleConfig::Remote { address: address.into(), api_key: api_key.into(), timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS }
    }

    /// Build a ready-to-use oracle. A remote backend without a key in the
    /// config falls back to the `QFLEET_API_KEY` environment variable.
    pub fn build(&self) -> Result<Arc<dyn RandomOracle>> {
        match self {
            OracleConfig::Local { seed: Some(seed) } => Ok(Arc::new(LocalOracle::seeded(*seed))),
            OracleConfig::Local { seed: None } => Ok(Arc::new(LocalOracle::from_entropy())),
            OracleConfig::Remote { address, api_key, timeout_secs } => {
                let key = if api_key.is_empty() { std::env::var(API_KEY_ENV).unwrap_or_default() } else { api_key.clone() };
                if key.is_empty() {
                    bail!("remote oracle at {address} needs an api key (config or {API_KEY_ENV})");
                }
                if *timeout_secs == 0 {
                    bail!("remote oracle timeout must be at least one second");
                }
                Ok(Arc::new(RemoteOracle::new(address.clone(), key.into_bytes(), Duration::from_secs(*timeout_secs))))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub game: GameConfig,
    pub oracle: OracleConfig,
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: HostConfig = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        config.game.validate().with_context(|| format!("invalid game settings in {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_config() {
        let config: HostConfig = serde_json::from_str(
            r#"{
                "game": { "board_size": 6, "round_limit": 20 },
                "oracle": { "backend": "remote", "address": "127.0.0.1:9000", "api_key": "abc" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.game.board_size, 6);
        assert_eq!(config.game.inventory.classical, 3);
        assert_eq!(
            config.oracle,
            OracleConfig::Remote { address: "127.0.0.1:9000".into(), api_key: "abc".into(), timeout_secs: 3600 }
        );
    }

    #[test]
    fn test_empty_config_is_local() {
        let config: HostConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.oracle.build().unwrap().name(), "local");
    }

    #[test]
    fn test_load_rejects_invalid_game() {
        let dir = std::env::temp_dir().join(format!("qfleet-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, r#"{ "game": { "round_limit": 0 } }"#).unwrap();
        let err = HostConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("round limit"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
