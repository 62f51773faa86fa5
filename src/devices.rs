//! Device table
//!
//! Devices are built once from configuration and never mutated. The
//! registry is shared behind an `Arc` and looked up by logical id.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;
use crate::error::{GatewayError, GatewayResult};

/// Default climate range when a device does not declare one (degC)
pub const DEFAULT_TEMP_MIN: f64 = 16.0;
pub const DEFAULT_TEMP_MAX: f64 = 30.0;

/// Device class - decides which reconciliation path handles a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Media,
    Playback,
    Light,
    ColorLight,
    Climate,
    Blind,
}

impl DeviceClass {
    /// Virtual device type used to mirror this class on the controller
    pub fn channel_type(self) -> ChannelType {
        match self {
            DeviceClass::Media | DeviceClass::Playback => ChannelType::Speaker,
            DeviceClass::Light | DeviceClass::ColorLight => ChannelType::Light,
            DeviceClass::Climate | DeviceClass::Blind => ChannelType::Blind,
        }
    }

    /// Home Assistant service domain for this class
    pub fn domain(self) -> &'static str {
        match self {
            DeviceClass::Media | DeviceClass::Playback => "media_player",
            DeviceClass::Light | DeviceClass::ColorLight => "light",
            DeviceClass::Climate => "climate",
            DeviceClass::Blind => "cover",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceClass::Media => "media",
            DeviceClass::Playback => "playback",
            DeviceClass::Light => "light",
            DeviceClass::ColorLight => "color_light",
            DeviceClass::Climate => "climate",
            DeviceClass::Blind => "blind",
        };
        f.write_str(s)
    }
}

/// Virtual device kinds exposed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ChannelType {
    #[serde(alias = "speaker")]
    Speaker,
    #[serde(alias = "light")]
    Light,
    #[serde(alias = "blind")]
    Blind,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelType::Speaker => "Speaker",
            ChannelType::Light => "Light",
            ChannelType::Blind => "Blind",
        };
        f.write_str(s)
    }
}

/// Inclusive temperature range for climate devices
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TempRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_TEMP_MIN,
            max: DEFAULT_TEMP_MAX,
        }
    }
}

impl TempRange {
    pub fn clamp(&self, temp: f64) -> f64 {
        temp.clamp(self.min, self.max)
    }

    /// Map a normalized dial position onto the range, rounded to 0.1 degC
    pub fn from_position(&self, position: f64) -> f64 {
        let pos = position.clamp(0.0, 1.0);
        round1(self.min + pos * (self.max - self.min))
    }

    /// Inverse of `from_position`, clamped to [0, 1]
    pub fn to_position(&self, temp: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((temp - self.min) / span).clamp(0.0, 1.0)
    }
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Immutable device descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub entity: String,
    pub name: String,
    pub class: DeviceClass,
    pub temp_range: Option<TempRange>,
}

impl Device {
    /// Climate range, falling back to the default for devices without one
    pub fn range(&self) -> TempRange {
        self.temp_range.unwrap_or_default()
    }
}

impl From<&DeviceConfig> for Device {
    fn from(cfg: &DeviceConfig) -> Self {
        Self {
            id: cfg.id.clone(),
            entity: cfg.entity.clone(),
            name: cfg.name.clone().unwrap_or_else(|| cfg.id.clone()),
            class: cfg.class,
            temp_range: cfg.range,
        }
    }
}

/// Lookup table of all configured devices
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
    /// Ids in config order (for listing and initial sync)
    order: Vec<String>,
}

impl DeviceRegistry {
    pub fn new(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut registry = Self::default();
        for device in devices {
            if registry.devices.contains_key(&device.id) {
                continue;
            }
            registry.order.push(device.id.clone());
            registry.devices.insert(device.id.clone(), device);
        }
        registry
    }

    pub fn from_config(configs: &[DeviceConfig]) -> Self {
        Self::new(configs.iter().map(Device::from))
    }

    pub fn get(&self, id: &str) -> GatewayResult<&Device> {
        self.devices
            .get(id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    /// Devices in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.order.iter().filter_map(|id| self.devices.get(id))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, class: DeviceClass) -> Device {
        Device {
            id: id.to_string(),
            entity: format!("x.{}", id),
            name: id.to_string(),
            class,
            temp_range: None,
        }
    }

    #[test]
    fn test_registry_lookup_and_order() {
        let registry = DeviceRegistry::new(vec![
            device("tv", DeviceClass::Media),
            device("desk", DeviceClass::Light),
            device("tv", DeviceClass::Blind), // duplicate id ignored
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("tv").unwrap().class, DeviceClass::Media);
        let ids: Vec<_> = registry.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["tv", "desk"]);
    }

    #[test]
    fn test_unknown_device_is_not_found() {
        let registry = DeviceRegistry::new(vec![]);
        assert!(matches!(registry.get("nope"), Err(GatewayError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn test_channel_types_per_class() {
        assert_eq!(DeviceClass::Playback.channel_type(), ChannelType::Speaker);
        assert_eq!(DeviceClass::ColorLight.channel_type(), ChannelType::Light);
        assert_eq!(DeviceClass::Climate.channel_type(), ChannelType::Blind);
        assert_eq!(DeviceClass::Blind.domain(), "cover");
    }

    #[test]
    fn test_temp_range_position_mapping() {
        let range = TempRange { min: 16.0, max: 30.0 };
        assert_eq!(range.from_position(0.5), 23.0);
        assert_eq!(range.from_position(0.0), 16.0);
        assert_eq!(range.from_position(1.7), 30.0);
        assert_eq!(range.from_position(0.123), 17.7);
        assert!((range.to_position(23.0) - 0.5).abs() < 1e-9);
        assert_eq!(range.to_position(40.0), 1.0);
    }

    #[test]
    fn test_class_deserializes_snake_case() {
        let class: DeviceClass = serde_yaml::from_str("color_light").unwrap();
        assert_eq!(class, DeviceClass::ColorLight);
        assert_eq!(class.to_string(), "color_light");
    }
}
