use crate::logging;
use capture::dto::packet::PacketDto;
use log::LevelFilter;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_OUTPUT: &str = "example.pcap";
const DEFAULT_REPEAT: i64 = 1;

pub struct Config {
    pub log_format: String,
    pub log_level: LevelFilter,
    pub output: PathBuf,
    pub repeat: i64,
    pub read_back: bool,
    pub packets: Vec<PacketDto>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: logging::DEFAULT_FORMAT.to_string(),
            log_level: LevelFilter::Info,
            output: PathBuf::from(DEFAULT_OUTPUT),
            repeat: DEFAULT_REPEAT,
            read_back: true,
            packets: vec![
                PacketDto {
                    source_ip: Some("4.3.6.8".to_string()),
                    destination_ip: Some("1.2.3.4".to_string()),
                    transport: Some("tcp".to_string()),
                    destination_port: Some(80),
                    ..Default::default()
                },
                PacketDto {
                    destination_ip: Some("5.4.3.2".to_string()),
                    transport: Some("tcp".to_string()),
                    destination_port: Some(30),
                    ..Default::default()
                },
            ],
        }
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Config", 6)?;
        state.serialize_field("log_format", &self.log_format)?;
        state.serialize_field("log_level", &self.log_level.to_string())?;
        state.serialize_field("output", &self.output.display().to_string())?;
        state.serialize_field("repeat", &self.repeat)?;
        state.serialize_field("read_back", &self.read_back)?;
        state.serialize_field("packets", &self.packets)?;
        state.end()
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(value) => value,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.save_to_file(path)?;
                return Ok(config);
            },
            Err(err) => return Err(ConfigError::IOError(err)),
        };

        let dto: ConfigDto =
            toml::from_str(&data).map_err(ConfigError::TomlDeserializationError)?;
        dto.into_config()
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let data = toml::to_string(&self).map_err(ConfigError::TomlSerializationError)?;

        fs::write(path, data).map_err(ConfigError::IOError)?;

        Ok(())
    }
}

#[derive(Deserialize)]
struct ConfigDto {
    log_format: String,
    log_level: String,
    output: String,
    #[serde(default = "default_repeat")]
    repeat: i64,
    #[serde(default)]
    read_back: bool,
    #[serde(default)]
    packets: Vec<PacketDto>,
}

fn default_repeat() -> i64 {
    DEFAULT_REPEAT
}

impl ConfigDto {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let config = Config {
            log_format: self.log_format,
            log_level: LevelFilter::from_str(&self.log_level)
                .map_err(|_| ConfigError::UnknownLogLevel)?,
            output: PathBuf::from(self.output.trim()),
            repeat: self.repeat,
            read_back: self.read_back,
            packets: self.packets,
        };

        Ok(config)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("TOML Serialization Error.")]
    TomlSerializationError(#[from] toml::ser::Error),

    #[error("TOML Deserialization Error.")]
    TomlDeserializationError(#[from] toml::de::Error),

    #[error("Unknown log level.")]
    UnknownLogLevel,
}

impl ConfigError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            ConfigError::IOError(err) => Some(err.to_string()),
            ConfigError::TomlSerializationError(err) => Some(err.to_string()),
            ConfigError::TomlDeserializationError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}
