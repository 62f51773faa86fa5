//! Home Assistant remote API
//!
//! The gateway talks to Home Assistant only through the [`HomeAssistant`]
//! trait: one state read and one service call. [`HassClient`] is the REST
//! implementation used at runtime.

mod client;

pub use client::HassClient;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::GatewayResult;

/// Authoritative state of one entity as reported by Home Assistant
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>, attributes: Value) -> Self {
        Self {
            entity_id: String::new(),
            state: state.into(),
            attributes: match attributes {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    /// Numeric attribute, or None when missing or not a number
    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(Value::as_f64)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(Value::as_bool)
    }

    /// Two-element numeric attribute such as `hs_color`
    pub fn attr_pair(&self, name: &str) -> Option<(f64, f64)> {
        let arr = self.attributes.get(name)?.as_array()?;
        match arr.as_slice() {
            [a, b, ..] => Some((a.as_f64()?, b.as_f64()?)),
            _ => None,
        }
    }

    pub fn is(&self, state: &str) -> bool {
        self.state.eq_ignore_ascii_case(state)
    }
}

/// Remote home-automation API consumed by the gateway
///
/// Implementations must bound every call with a timeout and report
/// non-success responses as errors.
#[async_trait]
pub trait HomeAssistant: Send + Sync {
    /// Read the current state of an entity
    async fn get_state(&self, entity: &str) -> GatewayResult<EntityState>;

    /// Invoke `domain.service` on an entity with extra service data
    ///
    /// `data` must be a JSON object (or null); `entity_id` is added to it.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity: &str,
        data: Value,
    ) -> GatewayResult<()>;
}
