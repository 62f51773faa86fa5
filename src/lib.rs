//! Knob GW - dial controller to Home Assistant gateway
//!
//! Continuous dial input is debounced per device/channel before it reaches
//! Home Assistant, volume and playback commands share a global cooldown, and
//! color lights remember their last meaningful color.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod gateway;
pub mod hass;
pub mod input;
pub mod paths;
pub mod sink;
pub mod state;

pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
