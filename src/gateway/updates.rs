//! Continuous virtual device updates
//!
//! Each field of an update is converted to its remote unit and handed to the
//! debouncer together with an optimistic local write. The playback twist is
//! the exception: it is a gesture, so it goes straight to the cooldown-gated
//! playback path.

use std::future::Future;
use tracing::{debug, trace};

use super::light::normalized_from_mired;
use super::{light::mired_from_normalized, CommandOutcome, Gateway, Gesture};
use crate::devices::{ChannelType, Device, DeviceClass};
use crate::error::{GatewayError, GatewayResult};
use crate::sink::{field, fields, Fields};
use crate::state::{Channel, UpdateValue};

impl Gateway {
    pub(crate) async fn apply_update(
        &self,
        device: &Device,
        channel: ChannelType,
        update: &Fields,
    ) -> GatewayResult<()> {
        let expected = device.class.channel_type();
        if channel != expected {
            return Err(GatewayError::InvalidInput(format!(
                "{} update for '{}', which is a {} device",
                channel, device.id, expected
            )));
        }

        let get = |name: &str| update.get(name).copied();

        match device.class {
            DeviceClass::Media => {
                if let Some(v) = get(field::VOLUME) {
                    self.schedule_volume(device, v * 100.0);
                }
            }
            DeviceClass::Playback => {
                if let Some(v) = get(field::VOLUME) {
                    match Gesture::from_twist(v) {
                        Some(gesture) => {
                            self.playback_gesture(device, gesture).await?;
                        }
                        None => trace!(device = %device.id, twist = v, "Twist inside dead zone"),
                    }
                }
            }
            DeviceClass::Light | DeviceClass::ColorLight => {
                if let Some(v) = get(field::BRIGHTNESS) {
                    self.schedule_brightness(device, v * 255.0);
                }
                if let Some(v) = get(field::COLORTEMP) {
                    self.schedule_color_temp(device, v);
                }
                let hue = get(field::HUE).map(|h| h * 360.0);
                let saturation = get(field::SATURATION).map(|s| s * 100.0);
                if hue.is_some() || saturation.is_some() {
                    if device.class == DeviceClass::ColorLight {
                        self.schedule_color(device, hue, saturation);
                    } else {
                        debug!(device = %device.id, "Ignoring color fields for a non-color light");
                    }
                }
            }
            DeviceClass::Climate => {
                if let Some(v) = get(field::POSITION) {
                    self.schedule_temperature(device, device.range().from_position(v));
                }
            }
            DeviceClass::Blind => {
                if let Some(v) = get(field::POSITION) {
                    self.schedule_position(device, v * 100.0);
                }
            }
        }

        Ok(())
    }

    /// Debounce one channel: write `local` now, run `remote` after the delay
    fn schedule<F, Fut>(&self, device: &Device, channel: Channel, value: UpdateValue, local: Fields, remote: F)
    where
        F: FnOnce(Gateway, Device, UpdateValue) -> Fut + Send + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let sink = self.sink.clone();
        let channel_type = device.class.channel_type();
        let device_id = device.id.clone();
        let gateway = self.clone_for_task();
        let owned = device.clone();

        self.debouncer.schedule(
            &device.id,
            channel,
            value,
            move |_| sink.write_state(channel_type, &device_id, &local),
            move |value| remote(gateway, owned, value),
        );
    }

    /// Debounced absolute volume (percent)
    ///
    /// If the cooldown gate rejects the apply, the dial is re-synced from the
    /// remote so it stops showing the unapplied level.
    pub fn schedule_volume(&self, device: &Device, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        self.schedule(
            device,
            Channel::Volume,
            UpdateValue::Level(percent),
            fields([(field::VOLUME, percent / 100.0)]),
            |gw, dev, value| async move {
                if gw.set_volume(&dev, value.level()).await? == CommandOutcome::Blocked {
                    gw.sync_device(&dev).await?;
                }
                Ok(())
            },
        );
    }

    /// Debounced brightness on the 0-255 scale
    pub fn schedule_brightness(&self, device: &Device, brightness: f64) {
        let level = brightness.clamp(0.0, 255.0).round();
        self.schedule(
            device,
            Channel::Brightness,
            UpdateValue::Level(level),
            fields([(field::BRIGHTNESS, level / 255.0)]),
            |gw, dev, value| async move { gw.set_brightness(&dev, value.level()).await.map(|_| ()) },
        );
    }

    /// Debounced color temperature (normalized 0-1, sent as mired)
    pub fn schedule_color_temp(&self, device: &Device, normalized: f64) {
        let mired = mired_from_normalized(normalized);
        self.schedule(
            device,
            Channel::ColorTemp,
            UpdateValue::Level(mired),
            fields([(field::COLORTEMP, normalized_from_mired(mired))]),
            |gw, dev, value| async move {
                gw.set_color_temp(&dev, normalized_from_mired(value.level()))
                    .await
                    .map(|_| ())
            },
        );
    }

    /// Debounced hue (degrees) / saturation (percent)
    ///
    /// Missing parts are merged from a still-pending color update for the
    /// same device, so moving hue then saturation inside one window keeps
    /// both. Whatever is still missing is resolved from the light's own
    /// state when the update is applied.
    pub fn schedule_color(&self, device: &Device, hue: Option<f64>, saturation: Option<f64>) {
        let pending = match self.debouncer.pending_value(&device.id, Channel::Color) {
            Some(UpdateValue::Color { hue, saturation }) => Some((hue, saturation)),
            _ => None,
        };

        let hue = hue.or_else(|| pending.and_then(|(h, _)| h));
        let saturation = saturation
            .or_else(|| pending.and_then(|(_, s)| s))
            .map(|s| s.clamp(0.0, 100.0));

        let mut local = Fields::new();
        if let Some(h) = hue {
            local.insert(field::HUE.to_string(), h.rem_euclid(360.0) / 360.0);
        }
        if let Some(s) = saturation {
            local.insert(field::SATURATION.to_string(), s / 100.0);
        }

        self.schedule(
            device,
            Channel::Color,
            UpdateValue::Color { hue, saturation },
            local,
            |gw, dev, value| async move {
                match value {
                    UpdateValue::Color { hue, saturation } => {
                        gw.set_color(&dev, hue, saturation).await.map(|_| ())
                    }
                    UpdateValue::Level(s) => gw.set_color(&dev, None, Some(s)).await.map(|_| ()),
                }
            },
        );
    }

    /// Debounced climate target (degC)
    pub fn schedule_temperature(&self, device: &Device, celsius: f64) {
        let range = device.range();
        let target = range.clamp(celsius);
        self.schedule(
            device,
            Channel::Temperature,
            UpdateValue::Level(target),
            fields([(field::POSITION, range.to_position(target))]),
            |gw, dev, value| async move { gw.set_temperature(&dev, value.level()).await.map(|_| ()) },
        );
    }

    /// Debounced blind position (percent)
    pub fn schedule_position(&self, device: &Device, percent: f64) {
        let position = percent.clamp(0.0, 100.0).round();
        self.schedule(
            device,
            Channel::Position,
            UpdateValue::Level(position),
            fields([(field::POSITION, position / 100.0)]),
            |gw, dev, value| async move { gw.set_position(&dev, value.level()).await.map(|_| ()) },
        );
    }
}
