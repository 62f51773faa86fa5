//! REST client for the Home Assistant HTTP API

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, trace};

use super::{EntityState, HomeAssistant};
use crate::config::HassConfig;
use crate::error::{GatewayError, GatewayResult};

/// Home Assistant REST client with a bounded per-request timeout
#[derive(Clone)]
pub struct HassClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HassClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Build from config; an explicit token (from env/CLI) wins over the file
    pub fn from_config(config: &HassConfig, token: Option<String>) -> anyhow::Result<Self> {
        Self::new(
            &config.url,
            token.or_else(|| config.token.clone()),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    fn transport_error(context: String, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::RemoteTimeout { context }
        } else {
            GatewayError::remote(context, err)
        }
    }
}

#[async_trait]
impl HomeAssistant for HassClient {
    async fn get_state(&self, entity: &str) -> GatewayResult<EntityState> {
        let context = format!("GET state of {}", entity);
        let url = format!("{}/api/states/{}", self.base_url, entity);
        trace!(%url, "Reading entity state");

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| Self::transport_error(context.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::remote(context, format!("HTTP {}", status)));
        }

        response
            .json::<EntityState>()
            .await
            .map_err(|e| Self::transport_error(context, e))
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity: &str,
        data: Value,
    ) -> GatewayResult<()> {
        let context = format!("{}.{} on {}", domain, service, entity);

        let mut body = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(GatewayError::InvalidInput(format!(
                    "service data for {} must be an object, got {}",
                    context, other
                )))
            }
        };
        body.insert("entity_id".to_string(), Value::String(entity.to_string()));

        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);
        let shown = Value::Object(body.clone());
        debug!(%url, body = %shown, "Calling service");

        let response = self
            .authorize(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error(context.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::remote(context, format!("HTTP {}", status)));
        }
        Ok(())
    }
}
