//! Controller event model and line parser
//!
//! The controller delivers two kinds of events:
//! - discrete action messages, `"<device-id> <action>"` (e.g. `"livingroom_tv volume up"`)
//! - continuous virtual device updates with normalized float fields
//!
//! On the line-based source, a line starting with `{` is a JSON update
//! (`{"device": "desk", "channel": "Light", "fields": {"brightness": 0.4}}`),
//! anything else is an action message. Blank lines and `#` comments are skipped.

use serde::Deserialize;
use std::str::FromStr;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::devices::ChannelType;
use crate::error::{GatewayError, GatewayResult};
use crate::sink::Fields;

/// Fixed action vocabulary for discrete messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    VolumeUp,
    VolumeDown,
    Mute,
    BrightnessUp,
    BrightnessDown,
    Bright,
    Dim,
    TempUp,
    TempDown,
    Heat,
    Cool,
    Auto,
    Open,
    Close,
    Stop,
    PositionUp,
    PositionDown,
    Power,
    On,
    Off,
}

impl Action {
    pub const ALL: [Action; 20] = [
        Action::VolumeUp,
        Action::VolumeDown,
        Action::Mute,
        Action::BrightnessUp,
        Action::BrightnessDown,
        Action::Bright,
        Action::Dim,
        Action::TempUp,
        Action::TempDown,
        Action::Heat,
        Action::Cool,
        Action::Auto,
        Action::Open,
        Action::Close,
        Action::Stop,
        Action::PositionUp,
        Action::PositionDown,
        Action::Power,
        Action::On,
        Action::Off,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::VolumeUp => "volume up",
            Action::VolumeDown => "volume down",
            Action::Mute => "mute",
            Action::BrightnessUp => "brightness up",
            Action::BrightnessDown => "brightness down",
            Action::Bright => "bright",
            Action::Dim => "dim",
            Action::TempUp => "temp up",
            Action::TempDown => "temp down",
            Action::Heat => "heat",
            Action::Cool => "cool",
            Action::Auto => "auto",
            Action::Open => "open",
            Action::Close => "close",
            Action::Stop => "stop",
            Action::PositionUp => "position up",
            Action::PositionDown => "position down",
            Action::Power => "power",
            Action::On => "on",
            Action::Off => "off",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = GatewayError;

    /// Case-insensitive; `_` and `-` are accepted as word separators
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .to_ascii_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| GatewayError::InvalidInput(format!("unknown action '{}'", s.trim())))
    }
}

/// One inbound controller event
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Action {
        device_id: String,
        action: Action,
    },
    Update {
        device_id: String,
        channel: ChannelType,
        fields: Fields,
    },
}

impl ControllerEvent {
    pub fn device_id(&self) -> &str {
        match self {
            ControllerEvent::Action { device_id, .. } | ControllerEvent::Update { device_id, .. } => device_id,
        }
    }
}

#[derive(Deserialize)]
struct RawUpdate {
    device: String,
    channel: ChannelType,
    #[serde(default)]
    fields: Fields,
}

/// Parse `"<device-id> <action>"`
pub fn parse_action_message(line: &str) -> GatewayResult<ControllerEvent> {
    let line = line.trim();
    let (device_id, action) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| GatewayError::InvalidInput(format!("expected '<device> <action>', got '{}'", line)))?;

    Ok(ControllerEvent::Action {
        device_id: device_id.to_string(),
        action: action.parse()?,
    })
}

/// Parse a JSON continuous update; fields are clamped to [0, 1]
pub fn parse_update(line: &str) -> GatewayResult<ControllerEvent> {
    let raw: RawUpdate = serde_json::from_str(line)
        .map_err(|e| GatewayError::InvalidInput(format!("bad update payload: {}", e)))?;

    let mut fields = Fields::new();
    for (name, value) in raw.fields {
        if !value.is_finite() {
            return Err(GatewayError::InvalidInput(format!(
                "field '{}' of {} is not a finite number",
                name, raw.device
            )));
        }
        fields.insert(name, value.clamp(0.0, 1.0));
    }

    Ok(ControllerEvent::Update {
        device_id: raw.device,
        channel: raw.channel,
        fields,
    })
}

/// Parse one source line; `Ok(None)` for blank lines and comments
pub fn parse_line(line: &str) -> GatewayResult<Option<ControllerEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    if trimmed.starts_with('{') {
        parse_update(trimmed).map(Some)
    } else {
        parse_action_message(trimmed).map(Some)
    }
}

/// Forward parsed events from a line-oriented reader (stdin, pipe, socket)
///
/// Malformed lines are logged and skipped. The task ends at EOF or when the
/// receiver is dropped.
pub fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<ControllerEvent>) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    use tokio::io::AsyncBufReadExt;

    tokio::spawn(async move {
        let mut lines = LinesStream::new(reader.lines());
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Event source read error: {}", e);
                    break;
                }
            };

            match parse_line(&line) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring controller line '{}': {}", line.trim(), e),
            }
        }
        debug!("Event source closed");
    })
}
