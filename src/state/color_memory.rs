//! Color memory
//!
//! Remembers the last meaningful hue/saturation per device so that fading a
//! light to white and back restores its previous hue.

use dashmap::DashMap;

/// Saturation (percent) at or below which a color counts as white
pub const MEANINGFUL_SATURATION: f64 = 5.0;

/// Remembered (hue, saturation) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RememberedColor {
    /// Degrees, [0, 360)
    pub hue: f64,
    /// Percent, [0, 100]
    pub saturation: f64,
}

/// Per-device store of the last meaningful color
#[derive(Debug, Default)]
pub struct ColorMemory {
    colors: DashMap<String, RememberedColor>,
}

/// Whether a saturation is high enough to carry a hue
pub fn is_meaningful(saturation: f64) -> bool {
    saturation > MEANINGFUL_SATURATION
}

impl ColorMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a color unless it is white or near-white
    ///
    /// Returns true if the color was stored.
    pub fn remember(&self, device_id: &str, hue: f64, saturation: f64) -> bool {
        if !is_meaningful(saturation) || !hue.is_finite() {
            return false;
        }
        self.colors.insert(
            device_id.to_string(),
            RememberedColor {
                hue: hue.rem_euclid(360.0),
                saturation: saturation.min(100.0),
            },
        );
        true
    }

    /// Stored color for the device, or the supplied fallback
    pub fn recall(&self, device_id: &str, fallback_hue: f64, fallback_sat: f64) -> (f64, f64) {
        self.colors
            .get(device_id)
            .map(|c| (c.hue, c.saturation))
            .unwrap_or((fallback_hue, fallback_sat))
    }

    pub fn get(&self, device_id: &str) -> Option<RememberedColor> {
        self.colors.get(device_id).map(|c| *c)
    }

    pub fn forget(&self, device_id: &str) {
        self.colors.remove(device_id);
    }
}
