use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("could not parse configuration file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ElevatorConfig {
    pub num_elevators: u8,
    pub num_floors: u8,
    /// Time to move one floor; also the emergency reaction bound.
    pub floor_travel_ms: u64,
    /// Door open plus door close.
    pub door_cycle_ms: u64,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        ElevatorConfig {
            num_elevators: 3,
            num_floors: 10,
            floor_travel_ms: 1000,
            door_cycle_ms: 2000,
        }
    }
}

impl ElevatorConfig {
    pub fn floor_travel(&self) -> Duration {
        Duration::from_millis(self.floor_travel_ms)
    }

    pub fn door_cycle(&self) -> Duration {
        Duration::from_millis(self.door_cycle_ms)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on how long an unassignable request waits before it is retried.
    pub retry_ms: u64,
    pub sync_period_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            retry_ms: 250,
            sync_period_ms: 1000,
        }
    }
}

impl DispatchConfig {
    pub fn retry(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_millis(self.sync_period_ms)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            enabled: true,
            port: 8081,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig {
            enabled: true,
            dir: PathBuf::from("backup"),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub refresh_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig { refresh_ms: 1000 }
    }
}

impl ConsoleConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub elevator: ElevatorConfig,
    pub dispatch: DispatchConfig,
    pub server: ServerConfig,
    pub backup: BackupConfig,
    pub console: ConsoleConfig,
}

impl Config {
    /// Loads `path`, or `config.json` in the working directory when no path is given.
    /// Only the implicit file may be absent, in which case defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::read(path)?
                } else {
                    Config::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elevator.num_elevators < 1 {
            return Err(ConfigError::Validation(
                "number of elevators must be at least 1".to_string(),
            ));
        }
        if self.elevator.num_floors < 2 {
            return Err(ConfigError::Validation(
                "number of floors must be at least 2".to_string(),
            ));
        }
        if self.elevator.floor_travel_ms == 0 || self.elevator.door_cycle_ms == 0 {
            return Err(ConfigError::Validation(
                "floor travel and door cycle times must be positive".to_string(),
            ));
        }
        if self.dispatch.retry_ms == 0 || self.dispatch.sync_period_ms == 0 {
            return Err(ConfigError::Validation(
                "dispatch retry and sync periods must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
