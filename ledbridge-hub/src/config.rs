use std::path::{Path, PathBuf};
use std::time::Duration;

use ledbridge_ble::{Pacing, PeripheralIdentity};
use ledbridge_proto::ble::{COMMAND_DELAY_MS, CONNECT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT};
use ledbridge_proto::{CommandParseError, CommandTable};

pub const CONFIG_FILE: &str = "config.json";

/// Everything the bridge needs, read once at startup
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// BLE address of the LED controller, e.g. `BE:58:30:00:CC:4A`
    pub address: String,
    /// Characteristic the commands are written to
    pub characteristic: uuid::Uuid,
    #[serde(default)]
    pub commands: CommandTable,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_command_delay_ms")]
    pub command_delay_ms: u64,
    #[serde(default)]
    pub serialize_requests: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_ms() -> u64 {
    CONNECT_TIMEOUT_MS
}

fn default_command_delay_ms() -> u64 {
    COMMAND_DELAY_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory, set LEDBRIDGE_HOME")]
    NoHome,
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("config file already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("invalid peripheral address {0:?}, expected six hex octets like AA:BB:CC:DD:EE:FF")]
    InvalidAddress(String),
    #[error("invalid command payload: {0}")]
    InvalidCommand(#[from] CommandParseError),
    #[error("connect_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

impl Config {
    pub fn new(address: impl Into<String>, characteristic: uuid::Uuid) -> Self {
        Self {
            address: address.into(),
            characteristic,
            commands: CommandTable::default(),
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_delay_ms: default_command_delay_ms(),
            serialize_requests: false,
            log_level: default_log_level(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_ble_address(&self.address) {
            return Err(ConfigError::InvalidAddress(self.address.clone()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.commands.validate()?;
        Ok(())
    }

    pub fn peripheral(&self) -> PeripheralIdentity {
        PeripheralIdentity {
            address: self.address.to_uppercase(),
            characteristic: self.characteristic,
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            command_delay: Duration::from_millis(self.command_delay_ms),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_ble_address(s: &str) -> bool {
    let octets: Vec<&str> = s.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `$LEDBRIDGE_HOME`, or `~/.ledbridge`
pub fn ledbridge_home() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var("LEDBRIDGE_HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|h| h.join(".ledbridge"))
        .ok_or(ConfigError::NoHome)
}

pub fn read_config(home: &Path) -> Result<Config, ConfigError> {
    let path = home.join(CONFIG_FILE);

    if !path.exists() {
        return Err(ConfigError::NotFound(path));
    }

    let content = std::fs::read_to_string(&path)?;
    let config: Config =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
    config.validate()?;
    Ok(config)
}

/// Write `config` to `home`, refusing to replace an existing file
pub fn create_config(home: &Path, config: &Config) -> Result<PathBuf, ConfigError> {
    config.validate()?;
    let path = home.join(CONFIG_FILE);

    if path.exists() {
        return Err(ConfigError::AlreadyExists(path));
    }

    std::fs::create_dir_all(home)?;
    let content = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(&path, content)?;
    Ok(path)
}
