//! Blind (cover) position - 0 closed, 100 open

use serde_json::{json, Value};
use tracing::info;

use super::{CommandOutcome, Gateway};
use crate::devices::{Device, DeviceClass};
use crate::error::{GatewayError, GatewayResult};
use crate::hass::EntityState;

/// Current cover position in percent; falls back to the open/closed state
pub(crate) fn cover_position(state: &EntityState) -> Option<f64> {
    state.attr_f64("current_position").or_else(|| {
        if state.is("open") {
            Some(100.0)
        } else if state.is("closed") {
            Some(0.0)
        } else {
            None
        }
    })
}

impl Gateway {
    fn require_blind(device: &Device) -> GatewayResult<()> {
        if device.class == DeviceClass::Blind {
            Ok(())
        } else {
            Err(GatewayError::InvalidInput(format!(
                "'{}' is a {} device, not a blind",
                device.id, device.class
            )))
        }
    }

    pub async fn set_position(&self, device: &Device, percent: f64) -> GatewayResult<CommandOutcome> {
        Self::require_blind(device)?;

        let position = percent.clamp(0.0, 100.0).round();
        self.call(device, "set_cover_position", json!({ "position": position as u8 }))
            .await?;
        info!("🪟 {} position → {}%", device.name, position);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }

    pub async fn adjust_position(&self, device: &Device, delta: f64) -> GatewayResult<CommandOutcome> {
        Self::require_blind(device)?;

        let state = self.hass.get_state(&device.entity).await?;
        let current = cover_position(&state).unwrap_or(0.0);
        self.set_position(device, current + delta).await
    }

    /// `open_cover`, `close_cover` or `stop_cover`
    pub async fn cover_command(&self, device: &Device, service: &str) -> GatewayResult<CommandOutcome> {
        Self::require_blind(device)?;

        self.call(device, service, Value::Null).await?;
        info!("🪟 {} → {}", device.name, service);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cover_position_fallbacks() {
        assert_eq!(cover_position(&EntityState::new("open", json!({ "current_position": 40 }))), Some(40.0));
        assert_eq!(cover_position(&EntityState::new("open", json!({}))), Some(100.0));
        assert_eq!(cover_position(&EntityState::new("closed", json!({}))), Some(0.0));
        assert_eq!(cover_position(&EntityState::new("opening", json!({}))), None);
    }
}
