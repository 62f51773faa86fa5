//! Authoritative read-back: remote entity state -> virtual device fields

use tracing::{debug, info, warn};

use super::blind::cover_position;
use super::light::normalized_from_mired;
use super::{Gateway, TWIST_CENTER};
use crate::devices::{Device, DeviceClass};
use crate::error::GatewayResult;
use crate::hass::EntityState;
use crate::sink::{field, Fields};

/// Convert a remote entity state into normalized sink fields for a device
///
/// Attributes the remote does not report are left out, so a partial state
/// never resets the controller to zero.
pub fn state_fields(device: &Device, state: &EntityState) -> Fields {
    let mut out = Fields::new();
    let mut put = |name: &str, value: f64| {
        out.insert(name.to_string(), value.clamp(0.0, 1.0));
    };

    match device.class {
        DeviceClass::Media => {
            if let Some(level) = state.attr_f64("volume_level") {
                put(field::VOLUME, level);
            }
        }
        DeviceClass::Playback => put(field::VOLUME, TWIST_CENTER),
        DeviceClass::Light | DeviceClass::ColorLight => {
            if state.is("off") {
                put(field::BRIGHTNESS, 0.0);
            } else if let Some(b) = state.attr_f64("brightness") {
                put(field::BRIGHTNESS, b / 255.0);
            }

            if device.class == DeviceClass::ColorLight {
                if let Some((hue, sat)) = state.attr_pair("hs_color") {
                    put(field::HUE, hue.rem_euclid(360.0) / 360.0);
                    put(field::SATURATION, sat / 100.0);
                }
                if let Some(mired) = state.attr_f64("color_temp") {
                    put(field::COLORTEMP, normalized_from_mired(mired));
                }
            }
        }
        DeviceClass::Climate => {
            if let Some(t) = state.attr_f64("temperature") {
                put(field::POSITION, device.range().to_position(t));
            }
        }
        DeviceClass::Blind => {
            if let Some(p) = cover_position(state) {
                put(field::POSITION, p / 100.0);
            }
        }
    }

    out
}

impl Gateway {
    /// Read a device's remote state and mirror it to the sink
    pub async fn sync_device(&self, device: &Device) -> GatewayResult<Fields> {
        let state = self.hass.get_state(&device.entity).await?;

        if device.class == DeviceClass::ColorLight {
            if let Some((hue, sat)) = state.attr_pair("hs_color") {
                self.colors.remember(&device.id, hue, sat);
            }
        }

        let fields = state_fields(device, &state);
        if fields.is_empty() {
            debug!(device = %device.id, state = %state.state, "Nothing to mirror");
        } else {
            self.write_local(device, &fields);
        }
        Ok(fields)
    }

    /// Mirror every configured device; returns how many synced cleanly
    pub async fn sync_all(&self) -> usize {
        let mut synced = 0;
        for device in self.devices.iter() {
            match self.sync_device(device).await {
                Ok(_) => synced += 1,
                Err(e) => warn!(device = %device.id, "Initial sync failed: {}", e),
            }
        }
        info!("🔄 Synced {}/{} devices", synced, self.devices.len());
        synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::TempRange;
    use crate::sink::fields;
    use serde_json::json;

    fn device(class: DeviceClass) -> Device {
        Device {
            id: "d".into(),
            entity: "x.d".into(),
            name: "D".into(),
            class,
            temp_range: Some(TempRange { min: 16.0, max: 30.0 }),
        }
    }

    #[test]
    fn test_light_fields() {
        let state = EntityState::new(
            "on",
            json!({ "brightness": 51, "hs_color": [90.0, 50.0], "color_temp": 327 }),
        );

        let plain = state_fields(&device(DeviceClass::Light), &state);
        assert_eq!(plain, fields([(field::BRIGHTNESS, 0.2)]));

        let color = state_fields(&device(DeviceClass::ColorLight), &state);
        assert_eq!(color[field::HUE], 0.25);
        assert_eq!(color[field::SATURATION], 0.5);
        assert!((color[field::COLORTEMP] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_light_off_is_zero() {
        let state = EntityState::new("off", json!({ "brightness": 200 }));
        assert_eq!(
            state_fields(&device(DeviceClass::Light), &state),
            fields([(field::BRIGHTNESS, 0.0)])
        );
    }

    #[test]
    fn test_climate_and_playback_fields() {
        let climate = EntityState::new("heat", json!({ "temperature": 23.0 }));
        assert_eq!(
            state_fields(&device(DeviceClass::Climate), &climate),
            fields([(field::POSITION, 0.5)])
        );

        let playing = EntityState::new("playing", json!({ "volume_level": 0.9 }));
        assert_eq!(
            state_fields(&device(DeviceClass::Playback), &playing),
            fields([(field::VOLUME, 0.5)])
        );
    }

    #[test]
    fn test_missing_attributes_are_omitted() {
        let state = EntityState::new("unavailable", json!({}));
        assert!(state_fields(&device(DeviceClass::Media), &state).is_empty());
        assert!(state_fields(&device(DeviceClass::Climate), &state).is_empty());
    }
}
