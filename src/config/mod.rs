//! Configuration management for Knob GW
//!
//! Handles loading, parsing, and validating the YAML configuration file.
//! The device table is read once at startup and never reloaded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::fs;

use crate::devices::{DeviceClass, TempRange};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub hass: HassConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    pub devices: Vec<DeviceConfig>,
}

/// Home Assistant REST endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HassConfig {
    #[serde(default = "default_hass_url")]
    pub url: String,
    /// Long-lived access token. Usually supplied through `HASS_TOKEN` instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Pipeline timing knobs
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Wait between a successful remote call and the authoritative read-back
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            cooldown_ms: default_cooldown_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// One entry of the device table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub id: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub class: DeviceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TempRange>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.hass.url.is_empty() {
            anyhow::bail!("hass.url cannot be empty");
        }
        if !(self.hass.url.starts_with("http://") || self.hass.url.starts_with("https://")) {
            anyhow::bail!("hass.url must start with http:// or https:// (got '{}')", self.hass.url);
        }
        if self.hass.timeout_ms == 0 {
            anyhow::bail!("hass.timeout_ms must be greater than 0");
        }
        if self.timing.debounce_ms == 0 {
            anyhow::bail!("timing.debounce_ms must be greater than 0");
        }

        if self.devices.is_empty() {
            anyhow::bail!("At least one device must be defined");
        }

        let mut seen = HashSet::new();
        for (idx, device) in self.devices.iter().enumerate() {
            if device.id.is_empty() {
                anyhow::bail!("Device {} id cannot be empty", idx);
            }
            if device.id.contains(char::is_whitespace) {
                anyhow::bail!("Device id '{}' cannot contain whitespace", device.id);
            }
            if !seen.insert(device.id.as_str()) {
                anyhow::bail!("Duplicate device id '{}'", device.id);
            }
            if !device.entity.contains('.') {
                anyhow::bail!(
                    "Device '{}' entity '{}' must look like <domain>.<object_id>",
                    device.id,
                    device.entity
                );
            }

            match (device.class, device.range) {
                (DeviceClass::Climate, Some(range)) => {
                    if range.min >= range.max || !range.min.is_finite() || !range.max.is_finite() {
                        anyhow::bail!(
                            "Device '{}' range min ({}) must be below max ({})",
                            device.id,
                            range.min,
                            range.max
                        );
                    }
                }
                (DeviceClass::Climate, None) => {}
                (class, Some(_)) => {
                    anyhow::bail!(
                        "Device '{}' has a range but class '{}' does not use one",
                        device.id,
                        class
                    );
                }
                (_, None) => {}
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_hass_url() -> String { "http://homeassistant.local:8123".to_string() }
fn default_timeout_ms() -> u64 { 8000 }
fn default_debounce_ms() -> u64 { 100 }
fn default_cooldown_ms() -> u64 { 2500 }
fn default_settle_ms() -> u64 { 300 }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
hass:
  url: "http://ha.test:8123"
devices:
  - id: livingroom_tv
    entity: media_player.living_room_tv
    name: Living Room TV
    class: media
  - id: hallway
    entity: climate.hallway
    class: climate
    range: { min: 16, max: 30 }
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.hass.timeout_ms, 8000);
        assert_eq!(config.hass.token, None);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.timing.cooldown(), Duration::from_millis(2500));
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].class, DeviceClass::Climate);
        assert_eq!(config.devices[1].range, Some(TempRange { min: 16.0, max: 30.0 }));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let yaml = r#"
hass: { url: "http://ha.test" }
devices:
  - { id: a, entity: light.a, class: light }
  - { id: a, entity: light.b, class: light }
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate device id"));
    }

    #[test]
    fn test_rejects_range_on_non_climate() {
        let yaml = r#"
hass: { url: "http://ha.test" }
devices:
  - { id: a, entity: light.a, class: light, range: { min: 1, max: 2 } }
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let yaml = r#"
hass: { url: "http://ha.test" }
devices:
  - { id: t, entity: climate.t, class: climate, range: { min: 30, max: 16 } }
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_bad_url_and_empty_devices() {
        let yaml = r#"
hass: { url: "ha.test" }
devices:
  - { id: a, entity: light.a, class: light }
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());

        let yaml = r#"
hass: { url: "http://ha.test" }
devices: []
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE)?;

        let config = AppConfig::load(&path.to_string_lossy()).await?;
        assert_eq!(config.devices[0].id, "livingroom_tv");

        let missing = temp_dir.path().join("missing.yaml");
        assert!(AppConfig::load(&missing.to_string_lossy()).await.is_err());
        Ok(())
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = AppConfig::from_yaml(include_str!("../../config.example.yaml")).unwrap();
        assert_eq!(config.devices.len(), 6);
        assert_eq!(config.timing, TimingConfig::default());
        assert!(config.hass.token.is_none());
    }
}
