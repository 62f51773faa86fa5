//! Pipeline state - debounce slots, cooldown gate and color memory
//!
//! These are the only pieces of mutable state shared between event handlers.
//! Each one carries its own synchronization so handlers can run on any
//! runtime thread.

pub mod color_memory;
pub mod cooldown;
pub mod debounce;
mod types;

pub use color_memory::{ColorMemory, RememberedColor, MEANINGFUL_SATURATION};
pub use cooldown::{CooldownGate, DEFAULT_COOLDOWN_MS};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_MS};
pub use types::{Channel, UpdateKey, UpdateValue};
