//! Configuration file support for dimfocus.
//!
//! Loads settings from ~/.config/dimfocus/config.toml if it exists,
//! otherwise uses sensible defaults. Command-line flags are applied on top
//! by `main`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::discovery::{CommandDiscovery, Discovery, FixedEndpoint};
use crate::opacity::DEFAULT_DIM_OPACITY;

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub opacity: OpacityConfig,
    pub ipc: IpcConfig,
}

/// Opacity settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OpacityConfig {
    /// Opacity of every window except the focused one (0.0 to 1.0)
    pub dimmed: f64,
}

impl Default for OpacityConfig {
    fn default() -> Self {
        Self {
            dimmed: DEFAULT_DIM_OPACITY,
        }
    }
}

/// Which window manager to look for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sway,
    /// Discovery through `I3SOCK` and `i3 --get-socketpath`. Stock i3 has no
    /// `opacity` command; this is for i3-protocol window managers that do.
    I3,
}

impl Backend {
    /// Whether the stock window manager understands `opacity set`
    pub fn supports_opacity(self) -> bool {
        match self {
            Backend::Sway => true,
            Backend::I3 => false,
        }
    }
}

/// IPC connection settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    pub backend: Backend,
    /// Explicit socket path; skips discovery when set
    pub socket: Option<PathBuf>,
    /// How long a read on the event socket blocks before checking for shutdown
    pub poll_interval_ms: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sway,
            socket: None,
            poll_interval_ms: 250,
        }
    }
}

impl Config {
    /// Load config from default path (~/.config/dimfocus/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dimfocus")
            .join("config.toml")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Check values that would make the window manager reject commands
    pub fn validate(&self) -> Result<()> {
        let dimmed = self.opacity.dimmed;
        if !dimmed.is_finite() || !(0.0..=1.0).contains(&dimmed) {
            bail!("Dim opacity must be between 0.0 and 1.0, got {}", dimmed);
        }
        if self.ipc.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ipc.poll_interval_ms)
    }

    /// Discovery strategy for the configured backend
    pub fn discovery(&self) -> Box<dyn Discovery> {
        match (&self.ipc.socket, self.ipc.backend) {
            (Some(path), _) => Box::new(FixedEndpoint::new(path.clone())),
            (None, Backend::Sway) => Box::new(CommandDiscovery::sway()),
            (None, Backend::I3) => Box::new(CommandDiscovery::i3()),
        }
    }
}
