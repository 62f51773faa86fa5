//! Media volume and playback reconciliation
//!
//! Volume is 0-100 % on the controller side and 0.0-1.0 `volume_level` on
//! the remote side. Every volume and playback command checks the cooldown
//! gate first; only playback commands restart it.

use serde_json::{json, Value};
use tracing::{debug, info};

use super::{round2, CommandOutcome, Gateway, Gesture, TWIST_CENTER};
use crate::devices::Device;
use crate::error::GatewayResult;
use crate::sink::{field, fields};

impl Gateway {
    /// Set absolute volume in percent
    pub async fn set_volume(&self, device: &Device, percent: f64) -> GatewayResult<CommandOutcome> {
        if let Some(left) = self.cooldown.remaining() {
            debug!(device = %device.id, ?left, "Volume change blocked by cooldown");
            return Ok(CommandOutcome::Blocked);
        }

        let level = round2(percent.clamp(0.0, 100.0) / 100.0);
        self.call(device, "volume_set", json!({ "volume_level": level }))
            .await?;
        info!("🔊 {} volume → {:.0}%", device.name, level * 100.0);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }

    /// Change volume relative to the remote's current level
    pub async fn adjust_volume(&self, device: &Device, delta: f64) -> GatewayResult<CommandOutcome> {
        if self.cooldown.is_blocked() {
            debug!(device = %device.id, "Volume adjust blocked by cooldown");
            return Ok(CommandOutcome::Blocked);
        }

        let state = self.hass.get_state(&device.entity).await?;
        let current = state.attr_f64("volume_level").unwrap_or_else(|| {
            debug!(device = %device.id, "No volume_level reported, assuming 0");
            0.0
        });

        self.set_volume(device, current * 100.0 + delta).await
    }

    pub async fn toggle_mute(&self, device: &Device) -> GatewayResult<CommandOutcome> {
        if self.cooldown.is_blocked() {
            debug!(device = %device.id, "Mute blocked by cooldown");
            return Ok(CommandOutcome::Blocked);
        }

        let state = self.hass.get_state(&device.entity).await?;
        let muted = state.attr_bool("is_volume_muted").unwrap_or(false);
        self.call(device, "volume_mute", json!({ "is_volume_muted": !muted }))
            .await?;
        info!("🔇 {} mute → {}", device.name, !muted);

        self.settle_and_sync(device).await;
        Ok(CommandOutcome::Sent)
    }

    /// Translate a twist gesture into a playback command
    ///
    /// Decrease always pauses. Increase resumes a paused player, skips when
    /// playing, and starts playback from any other state. The dial is snapped
    /// back to center afterwards, and immediately when the gate rejects it.
    pub async fn playback_gesture(&self, device: &Device, gesture: Gesture) -> GatewayResult<CommandOutcome> {
        // Claiming the window up front rejects twists that arrive while this
        // one is still reading state or in flight.
        if !self.cooldown.try_fire() {
            debug!(device = %device.id, ?gesture, left = ?self.cooldown.remaining(), "Playback gesture blocked by cooldown");
            self.snap_back(device);
            return Ok(CommandOutcome::Blocked);
        }

        let service = match gesture {
            Gesture::Decrease => "media_pause",
            Gesture::Increase => {
                let state = match self.hass.get_state(&device.entity).await {
                    Ok(state) => state,
                    Err(e) => {
                        self.snap_back(device);
                        return Err(e);
                    }
                };
                if state.is("paused") {
                    "media_play"
                } else if state.is("playing") {
                    "media_next_track"
                } else {
                    "media_play"
                }
            }
        };

        let result = self.call(device, service, Value::Null).await;
        self.snap_back(device);
        result?;

        info!("⏯️  {} → {}", device.name, service);
        Ok(CommandOutcome::Sent)
    }

    /// Return the playback twist dial to its neutral position
    pub(crate) fn snap_back(&self, device: &Device) {
        self.write_local(device, &fields([(field::VOLUME, TWIST_CENTER)]));
    }
}
