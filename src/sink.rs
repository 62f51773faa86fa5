//! Virtual device state sink
//!
//! The sink is the only way to give the user feedback on the controller
//! itself (LED ring, haptic position). Writes are fire-and-forget.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::devices::ChannelType;

/// Named normalized fields, each in [0, 1]
pub type Fields = BTreeMap<String, f64>;

/// Field names understood by the controller's virtual devices
pub mod field {
    pub const VOLUME: &str = "volume";
    pub const BRIGHTNESS: &str = "brightness";
    pub const HUE: &str = "hue";
    pub const SATURATION: &str = "saturation";
    pub const COLORTEMP: &str = "colortemp";
    pub const POSITION: &str = "position";
}

/// Build a field map from `(name, value)` pairs
pub fn fields<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Fields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Destination for virtual device state
///
/// Called optimistically (before the remote confirms) and again with the
/// authoritative read-back. Implementations must not block.
pub trait StateSink: Send + Sync {
    fn write_state(&self, channel: ChannelType, device_id: &str, fields: &Fields) -> anyhow::Result<()>;
}

/// Sink that logs every write - used when no controller bridge is attached
pub struct ConsoleSink {
    name: String,
    /// Write counter for debugging
    write_count: AtomicU64,
}

impl ConsoleSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            write_count: AtomicU64::new(0),
        }
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }
}

impl StateSink for ConsoleSink {
    fn write_state(&self, channel: ChannelType, device_id: &str, fields: &Fields) -> anyhow::Result<()> {
        let n = self.write_count.fetch_add(1, Ordering::Relaxed) + 1;

        let fields_str = if fields.is_empty() {
            "(no fields)".to_string()
        } else {
            fields
                .iter()
                .map(|(k, v)| format!("{}={:.3}", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        };

        info!(
            "🎛️  [{}] {} → {} {} ({}) [write #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            channel,
            device_id,
            fields_str,
            n
        );

        debug!(
            sink = self.name,
            channel = %channel,
            device = device_id,
            fields = ?fields,
            "ConsoleSink write"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_builder() {
        let f = fields([(field::BRIGHTNESS, 0.5), (field::HUE, 0.25)]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.get("brightness"), Some(&0.5));
    }

    #[test]
    fn test_console_sink_counts_writes() {
        let sink = ConsoleSink::new("test");
        sink.write_state(ChannelType::Light, "desk", &fields([(field::BRIGHTNESS, 1.0)]))
            .unwrap();
        sink.write_state(ChannelType::Blind, "blind", &Fields::new()).unwrap();
        assert_eq!(sink.write_count(), 2);
    }
}
