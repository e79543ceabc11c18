//! Configuration for the gateway daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use panelgate_core::engine::DEFAULT_CONTROLLER_PORT;
use panelgate_core::{EngineConfig, GateError, PanelIdentity, TransferConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Which controller to reach.
    pub controller: ControllerConfig,
    /// What the panel reports about itself.
    pub panel: PanelConfig,
    /// Where synchronized assets live.
    pub assets: AssetsConfig,
    /// Deadlines and reconnects.
    pub network: NetworkConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Controller endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Host name or address of the controller.
    pub host: String,
    /// TCP port (1319 on stock controllers).
    pub port: u16,
    /// System number.
    pub system: u16,
}

/// Panel identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Device number the panel registers as.
    pub device: u16,
    /// Port used for button and level input.
    pub port: u16,
    /// Model name reported in device info.
    pub model: String,
    /// Serial number. Empty to learn it from the controller.
    pub serial: String,
    pub firmware_id: u16,
}

/// Asset storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Local directory the `AMXPanel` tree maps onto.
    pub root: PathBuf,
    /// Manifest listing the expected files, relative to `root`.
    pub manifest: PathBuf,
}

/// Network tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: u64,
    /// Close the connection after this long without a frame.
    pub read_timeout_secs: u64,
    /// Failed connect cycles before the daemon gives up.
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_CONTROLLER_PORT,
            system: 1,
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        let identity = PanelIdentity::default();
        Self {
            device: 10001,
            port: 1,
            model: identity.model,
            serial: String::new(),
            firmware_id: identity.firmware_id,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let transfer = TransferConfig::default();
        Self {
            root: transfer.asset_root,
            manifest: transfer.manifest,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 120,
            read_timeout_secs: 120,
            max_retries: 3,
            retry_delay_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl GatewayConfig {
    /// Read configuration from a TOML file.
    ///
    /// `Ok(None)` when there is no file at `path`. Parse errors are
    /// returned so the caller can report them once logging is up.
    pub fn read(path: &Path) -> Result<Option<Self>, GateError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GateError::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|e| GateError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Validate and convert into the engine's configuration.
    ///
    /// Timeouts are clamped to at least one second and retries to at
    /// least one attempt.
    pub fn to_engine_config(&self) -> Result<EngineConfig, GateError> {
        let host = self.controller.host.trim();
        if host.is_empty() {
            return Err(GateError::Config("controller host is empty".into()));
        }
        let serial = self.panel.serial.trim();
        let identity = PanelIdentity {
            model: self.panel.model.clone(),
            firmware_id: self.panel.firmware_id,
            serial: (!serial.is_empty()).then(|| serial.to_string()),
            ..PanelIdentity::default()
        };

        Ok(EngineConfig {
            host: host.to_string(),
            port: self.controller.port,
            system: self.controller.system,
            device: self.panel.device,
            panel_port: self.panel.port,
            identity,
            transfer: TransferConfig {
                asset_root: self.assets.root.clone(),
                manifest: self.assets.manifest.clone(),
            },
            connect_timeout: secs(self.network.connect_timeout_secs),
            read_timeout: secs(self.network.read_timeout_secs),
            max_retries: self.network.max_retries.max(1),
            retry_delay: Duration::from_secs(self.network.retry_delay_secs),
            ..EngineConfig::default()
        })
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

// ── Tests ────────────────────────────────────────────────────────
