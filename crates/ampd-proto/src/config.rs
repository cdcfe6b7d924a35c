use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Where the player backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// HTTP base of the backend; cover URLs are built from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// `host:port` of the pub/sub bridge.
    #[serde(default = "default_address")]
    pub address: String,
    /// Delay between reconnect attempts of the transport.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Seconds jumped by the seek-forward/backward buttons.  0 hides them.
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Capacity of the broadcast channels used for fan-out.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            address: default_address(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            seek_step_secs: default_seek_step_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_address() -> String {
    platform::bridge_address()
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_seek_step_secs() -> u32 {
    10
}

fn default_channel_capacity() -> usize {
    256
}

impl Config {
    /// Load from the default config path.  A missing file yields defaults;
    /// nothing is written back.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
