//! Gateway - core orchestration of controller events and device updates
//!
//! The Gateway is the central orchestrator that owns:
//! - the immutable device table
//! - the debounce coordinator (one pending slot per device/channel)
//! - the global cooldown gate for volume and playback commands
//! - the color memory for color lights
//!
//! Continuous updates are written to the virtual device sink immediately and
//! reach Home Assistant through the debouncer. Action messages go straight to
//! the reconciliation functions. Every successful command is followed by a
//! settle delay and an authoritative read-back that is written to the sink.

mod actions;
mod blind;
mod climate;
mod light;
mod media;
mod sync;
mod updates;


pub use sync::state_fields;

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::devices::{Device, DeviceClass, DeviceRegistry};
use crate::error::GatewayResult;
use crate::hass::HomeAssistant;
use crate::input::ControllerEvent;
use crate::sink::{Fields, StateSink};
use crate::state::{ColorMemory, CooldownGate, Debouncer};

/// Relative step for `volume up` / `volume down` (percent)
pub const VOLUME_STEP: f64 = 10.0;
/// Relative step for `brightness up` / `brightness down` (0-255)
pub const BRIGHTNESS_STEP: f64 = 25.0;
/// Brightness for the `bright` preset
pub const BRIGHT_LEVEL: f64 = 255.0;
/// Brightness for the `dim` preset
pub const DIM_LEVEL: f64 = 64.0;
/// Relative step for `temp up` / `temp down` (degC)
pub const TEMP_STEP: f64 = 1.0;
/// Relative step for `position up` / `position down` (percent)
pub const POSITION_STEP: f64 = 10.0;
/// Color temperature range accepted by the remote (mired)
pub const MIRED_MIN: f64 = 154.0;
pub const MIRED_MAX: f64 = 500.0;
/// Neutral position of the playback twist dial
pub const TWIST_CENTER: f64 = 0.5;
/// Distance from center a twist must travel to count as a gesture
pub const TWIST_THRESHOLD: f64 = 0.15;

/// Result of a command that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The remote call was issued and succeeded
    Sent,
    /// Suppressed by the cooldown gate; nothing was sent
    Blocked,
}

/// Direction of a playback twist gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Increase,
    Decrease,
}

impl Gesture {
    /// Classify a twist position; None inside the dead zone around center
    pub fn from_twist(position: f64) -> Option<Self> {
        if position >= TWIST_CENTER + TWIST_THRESHOLD {
            Some(Gesture::Increase)
        } else if position <= TWIST_CENTER - TWIST_THRESHOLD {
            Some(Gesture::Decrease)
        } else {
            None
        }
    }
}

/// Main gateway orchestrating controller input and Home Assistant commands
pub struct Gateway {
    pub(crate) devices: Arc<DeviceRegistry>,
    pub(crate) hass: Arc<dyn HomeAssistant>,
    pub(crate) sink: Arc<dyn StateSink>,
    pub(crate) debouncer: Debouncer,
    pub(crate) cooldown: CooldownGate,
    pub(crate) colors: Arc<ColorMemory>,
    /// Wait before re-reading state after a successful command
    pub(crate) settle: Duration,
}

impl Gateway {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        hass: Arc<dyn HomeAssistant>,
        sink: Arc<dyn StateSink>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            devices,
            hass,
            sink,
            debouncer: Debouncer::new(timing.debounce()),
            cooldown: CooldownGate::new(timing.cooldown()),
            colors: Arc::new(ColorMemory::new()),
            settle: timing.settle(),
        }
    }

    /// Clone all shared fields for spawning background tasks
    ///
    /// Every field is Arc-backed, so the clone shares the same pending map,
    /// cooldown timestamp and color memory as the original.
    pub(crate) fn clone_for_task(&self) -> Self {
        Self {
            devices: Arc::clone(&self.devices),
            hass: Arc::clone(&self.hass),
            sink: Arc::clone(&self.sink),
            debouncer: self.debouncer.clone(),
            cooldown: self.cooldown.clone(),
            colors: Arc::clone(&self.colors),
            settle: self.settle,
        }
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    pub fn colors(&self) -> &ColorMemory {
        &self.colors
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Handle one controller event; failures are logged, never returned
    pub async fn handle_event(&self, event: ControllerEvent) {
        let device_id = event.device_id().to_string();
        if let Err(e) = self.dispatch(event).await {
            if e.is_remote() {
                warn!(device = %device_id, "Remote command failed: {}", e);
            } else {
                warn!(device = %device_id, "Ignoring controller event: {}", e);
            }
        }
    }

    /// Run the event loop until the source closes or `shutdown` resolves
    ///
    /// Events are taken in arrival order. Debounced updates only touch the
    /// sink and the pending map, so they are handled inline and a burst for
    /// one device/channel reaches the debouncer in the order it was sent.
    /// Action messages and playback gestures await the remote and run in
    /// their own task. When the source closes, pending updates are flushed
    /// before the loop returns.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ControllerEvent>,
        shutdown: impl Future<Output = ()>,
    ) {
        info!("Ready to process controller events!");

        tokio::pin!(shutdown);
        let mut interrupted = false;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Event source closed, stopping event loop");
                        break;
                    };
                    debug!("Controller event: {:?}", event);

                    if self.awaits_remote(&event) {
                        let gw = Arc::clone(&self);
                        tokio::spawn(async move {
                            gw.handle_event(event).await;
                        });
                    } else {
                        self.handle_event(event).await;
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping event loop");
                    interrupted = true;
                    break;
                }
            }
        }

        // Let the last debounced values of a piped session reach the remote
        if !interrupted {
            while self.debouncer.pending_count() > 0 {
                tokio::time::sleep(self.debouncer.delay()).await;
            }
        }

        info!("Shutting down...");
        self.shutdown();
    }

    /// True for events whose handling waits on a remote call
    fn awaits_remote(&self, event: &ControllerEvent) -> bool {
        match event {
            ControllerEvent::Action { .. } => true,
            ControllerEvent::Update { device_id, .. } => matches!(
                self.devices.get(device_id).map(|d| d.class),
                Ok(DeviceClass::Playback)
            ),
        }
    }

    /// Parse and handle a raw `"<device-id> <action>"` message
    pub async fn on_action_message(&self, message: &str) {
        match crate::input::parse_action_message(message) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => warn!("Ignoring action message '{}': {}", message.trim(), e),
        }
    }

    async fn dispatch(&self, event: ControllerEvent) -> GatewayResult<()> {
        match event {
            ControllerEvent::Action { device_id, action } => {
                let device = self.devices.get(&device_id)?.clone();
                debug!(device = %device.id, %action, "Action message");
                let outcome = self.run_action(&device, action).await?;
                debug!(device = %device.id, %action, ?outcome, "Action complete");
                Ok(())
            }
            ControllerEvent::Update {
                device_id,
                channel,
                fields,
            } => {
                let device = self.devices.get(&device_id)?.clone();
                self.apply_update(&device, channel, &fields).await
            }
        }
    }

    /// Cancel every scheduled remote apply (used at shutdown)
    pub fn shutdown(&self) {
        let dropped = self.debouncer.cancel_all();
        if dropped > 0 {
            debug!("Dropped {} pending update(s) at shutdown", dropped);
        }
    }

    /// Issue `<class domain>.<service>` on the device's entity
    pub(crate) async fn call(&self, device: &Device, service: &str, data: Value) -> GatewayResult<()> {
        self.hass
            .call_service(device.class.domain(), service, &device.entity, data)
            .await
    }

    /// Write to the virtual device sink, logging (not propagating) failures
    pub(crate) fn write_local(&self, device: &Device, fields: &Fields) {
        if let Err(e) = self
            .sink
            .write_state(device.class.channel_type(), &device.id, fields)
        {
            warn!(device = %device.id, "Local state write failed: {:#}", e);
        }
    }

    /// Wait for the remote to settle, then mirror its state to the sink
    pub(crate) async fn settle_and_sync(&self, device: &Device) {
        tokio::time::sleep(self.settle).await;
        if let Err(e) = self.sync_device(device).await {
            warn!(device = %device.id, "Read-back failed: {}", e);
        }
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
