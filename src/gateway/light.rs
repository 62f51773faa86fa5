//! Light brightness, color and color temperature reconciliation

use serde_json::{json, Value};
use tracing::{debug, info};

use super::{CommandOutcome, Gateway, MIRED_MAX, MIRED_MIN};
use crate::devices::{round1, Device, DeviceClass};
use crate::error::{GatewayError, GatewayResult};
use crate::state::color_memory::is_meaningful;

/// Normalized color temperature -> mired, linear over [MIRED_MIN, MIRED_MAX]
pub fn mired_from_normalized(value: f64) -> f64 {
    (MIRED_MIN + value.clamp(0.0, 1.0) * (MIRED_MAX - MIRED_MIN)).round()
}

pub fn normalized_from_mired(mired: f64) -> f64 {
    ((mired - MIRED_MIN) / (MIRED_MAX - MIRED_MIN)).clamp(0.0, 1.0)
}

/// Resolve the hue to apply for a color update
///
/// An explicit hue always wins. Without one, a saturation rise out of white
/// (<= 5 % to > 5 %) takes the remembered hue; anything else keeps the
/// device's current hue.
pub(crate) fn resolve_hue(
    requested: Option<f64>,
    current: (f64, f64),
    new_saturation: f64,
    remembered: impl FnOnce() -> f64,
) -> f64 {
    match requested {
        Some(hue) => hue.rem_euclid(360.0),
        None if !is_meaningful(current.1) && is_meaningful(new_saturation) => remembered(),
        None => current.0,
    }
}

/// Resolve the saturation to apply for a color update
///
/// A hue-only update keeps the device's current saturation. On a white
/// light that would leave the new hue invisible, so the remembered
/// saturation is used instead.
pub(crate) fn resolve_saturation(
    requested: Option<f64>,
    current: (f64, f64),
    remembered: impl FnOnce() -> f64,
) -> f64 {
    match requested {
        Some(s) => s,
        None if is_meaningful(current.1) => current.1,
        None => remembered(),
    }
    .clamp(0.0, 100.0)
}

impl Gateway {
    fn require_light(device: &Device) -> GatewayResult<()> {
        match device.class {
            DeviceClass::Light | DeviceClass::ColorLight => Ok(()),
            other => Err(GatewayError::InvalidInput(format!(
                "'{}' is a {} device, not a light",
                device.id, other
            ))),
        }
    }

    /// Set brightness on the 0-255 scale; 0 turns the light off
    pub async fn set_brightness(&self, device: &Device, brightness: f64) -> GatewayResult<CommandOutcome> {
        Self::require_light(device)?;

        let level = brightness.clamp(0.0, 255.0).round();
        if level == 0.0 {
            self.call(device, "turn_off", Value::Null).await?;
            info!("💡 {} → off", device.name);
        } else {
            self.call(device, "turn_on", json!({ "brightness": level as u8 }))
                .await?;
            info!("💡 {} brightness → {}", device.name, level);
        }

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }

    pub async fn adjust_brightness(&self, device: &Device, delta: f64) -> GatewayResult<CommandOutcome> {
        Self::require_light(device)?;

        let state = self.hass.get_state(&device.entity).await?;
        let current = if state.is("off") {
            0.0
        } else {
            state.attr_f64("brightness").unwrap_or(0.0)
        };

        self.set_brightness(device, current + delta).await
    }

    /// Apply hue (degrees) and saturation (percent) to a color light
    ///
    /// Either part may be missing; it is then resolved against the state the
    /// light reports right now.
    pub async fn set_color(
        &self,
        device: &Device,
        hue: Option<f64>,
        saturation: Option<f64>,
    ) -> GatewayResult<CommandOutcome> {
        if device.class != DeviceClass::ColorLight {
            return Err(GatewayError::InvalidInput(format!(
                "'{}' is a {} device, not a color light",
                device.id, device.class
            )));
        }

        let state = self.hass.get_state(&device.entity).await?;
        let current = state.attr_pair("hs_color").unwrap_or((0.0, 0.0));
        self.colors.remember(&device.id, current.0, current.1);

        let saturation = resolve_saturation(saturation, current, || {
            self.colors.recall(&device.id, current.0, 100.0).1
        });

        let hue = resolve_hue(hue, current, saturation, || {
            let (recalled, _) = self.colors.recall(&device.id, current.0, current.1);
            debug!(device = %device.id, recalled, "Restoring remembered hue");
            recalled
        });

        let hue = round1(hue);
        let saturation = round1(saturation);
        self.call(device, "turn_on", json!({ "hs_color": [hue, saturation] }))
            .await?;
        self.colors.remember(&device.id, hue, saturation);
        info!("🎨 {} color → {}°/{}%", device.name, hue, saturation);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }

    /// Apply a normalized color temperature (0 = coolest, 1 = warmest)
    pub async fn set_color_temp(&self, device: &Device, normalized: f64) -> GatewayResult<CommandOutcome> {
        Self::require_light(device)?;

        let mired = mired_from_normalized(normalized);
        self.call(device, "turn_on", json!({ "color_temp": mired as u32 }))
            .await?;
        info!("🌡️  {} color temp → {} mired", device.name, mired);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mired_mapping() {
        assert_eq!(mired_from_normalized(0.0), 154.0);
        assert_eq!(mired_from_normalized(1.0), 500.0);
        assert_eq!(mired_from_normalized(0.5), 327.0);
        assert_eq!(mired_from_normalized(-3.0), 154.0);
        assert!((normalized_from_mired(327.0) - 0.5).abs() < 1e-9);
        assert_eq!(normalized_from_mired(600.0), 1.0);
    }

    #[test]
    fn test_resolve_hue_explicit_wins() {
        assert_eq!(resolve_hue(Some(370.0), (10.0, 0.0), 60.0, || 200.0), 10.0);
    }

    #[test]
    fn test_resolve_hue_rising_from_white_recalls() {
        assert_eq!(resolve_hue(None, (0.0, 0.0), 60.0, || 120.0), 120.0);
        assert_eq!(resolve_hue(None, (0.0, 5.0), 5.1, || 120.0), 120.0);
    }

    #[test]
    fn test_resolve_saturation() {
        assert_eq!(resolve_saturation(Some(140.0), (10.0, 80.0), || 30.0), 100.0);
        // Hue-only on a colored light keeps what the light shows
        assert_eq!(resolve_saturation(None, (120.0, 80.0), || 30.0), 80.0);
        // Hue-only on a white light
        assert_eq!(resolve_saturation(None, (0.0, 2.0), || 30.0), 30.0);
    }

    #[test]
    fn test_resolve_hue_otherwise_keeps_current() {
        // Already colored
        assert_eq!(resolve_hue(None, (45.0, 80.0), 60.0, || 120.0), 45.0);
        // Still white
        assert_eq!(resolve_hue(None, (45.0, 0.0), 3.0, || 120.0), 45.0);
    }
}
