//! Exposer configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/mouserelay/exposer.toml`
//! - Windows: `%APPDATA%/mouserelay/exposer.toml`

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mouserelay_server::ServerConfig;
use serde::{Deserialize, Serialize};

/// Exposer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the protocol server binds.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Protocol server port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds without a complete opcode before a session is dropped (0 = never).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Discard buffered samples when an agent connects.
    #[serde(default)]
    pub clear_on_connect: bool,

    /// Read pointer samples as JSON lines from stdin.
    #[serde(default = "default_true")]
    pub stdin_producer: bool,
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    mouserelay_server::DEFAULT_PORT
}

fn default_idle_timeout_secs() -> u64 {
    mouserelay_server::DEFAULT_IDLE_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            idle_timeout_secs: default_idle_timeout_secs(),
            clear_on_connect: false,
            stdin_producer: default_true(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    /// Loads configuration from `path`, writing defaults there if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// The protocol server settings derived from this configuration.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_address,
            port: self.port,
            idle_timeout: match self.idle_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            clear_on_connect: self.clear_on_connect,
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("mouserelay")
            .join("exposer.toml")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("mouserelay").join("exposer.toml")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/mouserelay/exposer.toml")
    }
}
