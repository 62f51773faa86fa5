//! Pending-update type definitions
//!
//! Defines the keys and values the debounce coordinator tracks per device.

use serde::{Deserialize, Serialize};

/// Kind of continuous value a device can receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Volume,
    Brightness,
    Color,
    ColorTemp,
    Temperature,
    Position,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Volume => write!(f, "volume"),
            Channel::Brightness => write!(f, "brightness"),
            Channel::Color => write!(f, "color"),
            Channel::ColorTemp => write!(f, "colortemp"),
            Channel::Temperature => write!(f, "temperature"),
            Channel::Position => write!(f, "position"),
        }
    }
}

/// Key of a pending update: one slot per (device, channel)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateKey {
    pub device_id: String,
    pub channel: Channel,
}

impl UpdateKey {
    pub fn new(device_id: impl Into<String>, channel: Channel) -> Self {
        Self {
            device_id: device_id.into(),
            channel,
        }
    }
}

impl std::fmt::Display for UpdateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.channel)
    }
}

/// Unit-converted payload carried by a pending update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateValue {
    /// Scalar in the remote unit (percent, 0-255, mired, degC)
    Level(f64),
    /// Hue in degrees and saturation in percent; either is None when the
    /// controller did not move it
    Color { hue: Option<f64>, saturation: Option<f64> },
}

impl UpdateValue {
    /// Scalar payload; color updates report their saturation (0 if unset)
    pub fn level(&self) -> f64 {
        match self {
            UpdateValue::Level(v) => *v,
            UpdateValue::Color { saturation, .. } => saturation.unwrap_or(0.0),
        }
    }
}
