//! Climate target temperature and HVAC mode

use serde_json::json;
use tracing::{debug, info};

use super::{CommandOutcome, Gateway};
use crate::devices::{round1, Device, DeviceClass};
use crate::error::{GatewayError, GatewayResult};

impl Gateway {
    fn require_climate(device: &Device) -> GatewayResult<()> {
        if device.class == DeviceClass::Climate {
            Ok(())
        } else {
            Err(GatewayError::InvalidInput(format!(
                "'{}' is a {} device, not a climate device",
                device.id, device.class
            )))
        }
    }

    /// Set the target temperature, clamped to the device range
    pub async fn set_temperature(&self, device: &Device, celsius: f64) -> GatewayResult<CommandOutcome> {
        Self::require_climate(device)?;

        let target = round1(device.range().clamp(celsius));
        self.call(device, "set_temperature", json!({ "temperature": target }))
            .await?;
        info!("🌡️  {} target → {:.1}°C", device.name, target);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }

    pub async fn adjust_temperature(&self, device: &Device, delta: f64) -> GatewayResult<CommandOutcome> {
        Self::require_climate(device)?;

        let range = device.range();
        let state = self.hass.get_state(&device.entity).await?;
        let current = state.attr_f64("temperature").unwrap_or_else(|| {
            let mid = (range.min + range.max) / 2.0;
            debug!(device = %device.id, mid, "No target temperature reported, using midpoint");
            mid
        });

        self.set_temperature(device, current + delta).await
    }

    /// Switch HVAC mode (`heat`, `cool`, `auto`)
    pub async fn set_hvac_mode(&self, device: &Device, mode: &str) -> GatewayResult<CommandOutcome> {
        Self::require_climate(device)?;

        self.call(device, "set_hvac_mode", json!({ "hvac_mode": mode }))
            .await?;
        info!("🌡️  {} mode → {}", device.name, mode);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }
}
