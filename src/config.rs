// THEORY:
// The `config` module defines the typed configuration surface for the whole
// engine. Everything downstream of this file assumes a validated config:
// unique names, non-zero intervals, known kinds. Parsing happens exactly
// once, at startup, and the rest of the system never touches raw config
// text.
//
// The on-disk format is TOML. Optional fields fall back to the same
// defaults the engine would choose on its own (broker port 1883, discovery
// prefix `homeassistant`, 30 second polling), so a minimal config stays
// minimal.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::errors::ConfigError;

/// Full engine configuration, as loaded from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
}

/// Broker connection and discovery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

/// How the engine presents itself in discovery device blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Identifier prefix; the per-source device id is `{prefix}_{source}`.
    #[serde(default = "default_device_prefix")]
    pub prefix: String,
    /// Display-name prefix; the per-source device name is `{title} {source}`.
    #[serde(default = "default_device_title")]
    pub title: String,
    #[serde(default = "default_device_model")]
    pub model: String,
    #[serde(default = "default_device_manufacturer")]
    pub manufacturer: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            prefix: default_device_prefix(),
            title: default_device_title(),
            model: default_device_model(),
            manufacturer: default_device_manufacturer(),
        }
    }
}

/// The fixed set of source kinds. `Stream` is reserved; it parses but has no
/// registered constructor yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Folder,
    Stream,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Folder => "folder",
            SourceKind::Stream => "stream",
        }
    }
}

/// One configured image origin.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_source_kind")]
    pub kind: SourceKind,
    pub path: PathBuf,
    /// Polling cadence in seconds; must be at least 1.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

/// The fixed set of processor kinds. `Ndvi` is reserved; it parses but has
/// no registered constructor yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    GreenPixels,
    Ndvi,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::GreenPixels => "green_pixels",
            ProcessorKind::Ndvi => "ndvi",
        }
    }
}

/// One configured metric computation unit.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_processor_kind")]
    pub kind: ProcessorKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub quadrants: bool,
    /// Green-detection margin; only meaningful for `green_pixels`.
    #[serde(default)]
    pub margin: u8,
}

fn default_port() -> u16 {
    1883
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_owned()
}

fn default_device_prefix() -> String {
    "greenwatch".to_owned()
}

fn default_device_title() -> String {
    "Greenwatch".to_owned()
}

fn default_device_model() -> String {
    "Image Analysis Engine".to_owned()
}

fn default_device_manufacturer() -> String {
    "Greenwatch".to_owned()
}

fn default_source_kind() -> SourceKind {
    SourceKind::Folder
}

fn default_processor_kind() -> ProcessorKind {
    ProcessorKind::GreenPixels
}

fn default_enabled() -> bool {
    true
}

fn default_update_interval() -> u64 {
    30
}

impl Config {
    /// Loads and validates a config file; a missing file falls back to the
    /// built-in defaults so the engine can run out of the box.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        } else {
            warn!(path = %path.display(), "config file not found; using built-in defaults");
            Self::builtin_default()
        };
        config.validate()?;
        Ok(config)
    }

    /// The fallback configuration used when no config file exists: one local
    /// folder source and one whole-image green pixel counter.
    pub fn builtin_default() -> Self {
        Self {
            mqtt: MqttConfig {
                host: "localhost".to_owned(),
                port: default_port(),
                username: None,
                password: None,
                discovery_prefix: default_discovery_prefix(),
            },
            device: DeviceConfig::default(),
            sources: vec![SourceConfig {
                name: "Camera Left".to_owned(),
                kind: SourceKind::Folder,
                path: PathBuf::from("/share/greenwatch/camera_left"),
                update_interval: default_update_interval(),
            }],
            processors: vec![ProcessorConfig {
                name: "Green Pixels".to_owned(),
                kind: ProcessorKind::GreenPixels,
                enabled: true,
                quadrants: false,
                margin: 0,
            }],
        }
    }

    /// Structural validation beyond what serde can express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_sources = std::collections::HashSet::new();
        for source in &self.sources {
            if !seen_sources.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSourceName(source.name.clone()));
            }
            if source.update_interval == 0 {
                return Err(ConfigError::ZeroInterval(source.name.clone()));
            }
        }
        let mut seen_processors = std::collections::HashSet::new();
        for processor in &self.processors {
            if !seen_processors.insert(processor.name.as_str()) {
                return Err(ConfigError::DuplicateProcessorName(processor.name.clone()));
            }
        }
        Ok(())
    }
}
