//! Discrete action messages
//!
//! Action messages bypass the debouncer. Each (class, action) pair maps to
//! one reconciliation call; pairs that make no sense for a class are
//! rejected as invalid input.

use serde_json::Value;
use tracing::info;

use super::{
    CommandOutcome, Gateway, BRIGHTNESS_STEP, BRIGHT_LEVEL, DIM_LEVEL, POSITION_STEP, TEMP_STEP,
    VOLUME_STEP,
};
use crate::devices::{Device, DeviceClass};
use crate::error::{GatewayError, GatewayResult};
use crate::input::Action;

impl Gateway {
    pub async fn run_action(&self, device: &Device, action: Action) -> GatewayResult<CommandOutcome> {
        use Action::*;
        use DeviceClass as C;

        match (device.class, action) {
            (C::Media | C::Playback, VolumeUp) => self.adjust_volume(device, VOLUME_STEP).await,
            (C::Media | C::Playback, VolumeDown) => self.adjust_volume(device, -VOLUME_STEP).await,
            (C::Media | C::Playback, Mute) => self.toggle_mute(device).await,

            (C::Light | C::ColorLight, BrightnessUp) => {
                self.adjust_brightness(device, BRIGHTNESS_STEP).await
            }
            (C::Light | C::ColorLight, BrightnessDown) => {
                self.adjust_brightness(device, -BRIGHTNESS_STEP).await
            }
            (C::Light | C::ColorLight, Bright) => self.set_brightness(device, BRIGHT_LEVEL).await,
            (C::Light | C::ColorLight, Dim) => self.set_brightness(device, DIM_LEVEL).await,

            (C::Climate, TempUp) => self.adjust_temperature(device, TEMP_STEP).await,
            (C::Climate, TempDown) => self.adjust_temperature(device, -TEMP_STEP).await,
            (C::Climate, Heat) => self.set_hvac_mode(device, "heat").await,
            (C::Climate, Cool) => self.set_hvac_mode(device, "cool").await,
            (C::Climate, Auto) => self.set_hvac_mode(device, "auto").await,

            (C::Blind, Open | On) => self.cover_command(device, "open_cover").await,
            (C::Blind, Close | Off) => self.cover_command(device, "close_cover").await,
            (C::Blind, Stop) => self.cover_command(device, "stop_cover").await,
            (C::Blind, PositionUp) => self.adjust_position(device, POSITION_STEP).await,
            (C::Blind, PositionDown) => self.adjust_position(device, -POSITION_STEP).await,

            (_, Power) => self.power(device, "toggle").await,
            (_, On) => self.power(device, "turn_on").await,
            (_, Off) => self.power(device, "turn_off").await,

            (class, action) => Err(GatewayError::InvalidInput(format!(
                "action '{}' does not apply to {} device '{}'",
                action, class, device.id
            ))),
        }
    }

    /// `toggle`, `turn_on` or `turn_off` in the device's own domain
    pub async fn power(&self, device: &Device, service: &str) -> GatewayResult<CommandOutcome> {
        self.call(device, service, Value::Null).await?;
        info!("⏻ {} → {}", device.name, service);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }
}
