use reqwest::{Client, ClientBuilder};
use std::time::{Duration, Instant};

use super::{
    errors::DeliveryError,
    http_client::{AttemptReport, CBOR_CONTENT_TYPE},
    outcome::{DeliveryResult, DeliveryTarget},
};
use crate::config::{PoolConfig, RelayConfig};

const API_KEY_HEADER: &str = "api-key";

/// Client for the Maestro transaction manager.
///
/// Built once at startup; the body it submits is the hex encoding of the raw
/// transaction. Any 2xx response counts as accepted.
#[derive(Debug, Clone)]
pub struct MaestroRelay {
    client: Client,
    endpoint: String,
    api_key: String,
    turbo: bool,
    timeout: Duration,
}

impl MaestroRelay {
    /// Builds the relay when one is configured.
    ///
    /// Returns `Ok(None)` when no API key is set.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::ClientBuild`] if the underlying reqwest client fails to build.
    pub fn from_config(
        relay: &RelayConfig,
        pool: &PoolConfig,
        timeout: Duration,
    ) -> Result<Option<Self>, DeliveryError> {
        let Some(api_key) = relay.api_key.as_deref().filter(|_| relay.enabled()) else {
            return Ok(None);
        };

        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .connect_timeout(Duration::from_secs(pool.handshake_timeout_secs))
            .timeout(timeout)
            .use_rustls_tls()
            .user_agent(concat!("txmirror/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build relay http client");
                DeliveryError::ClientBuild(e.to_string())
            })?;

        let mut endpoint = format!("{}/txmanager", relay.base_url());
        if relay.turbo {
            endpoint.push_str("/turbosubmit");
        }

        Ok(Some(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            turbo: relay.turbo,
            timeout,
        }))
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn target(&self) -> DeliveryTarget {
        DeliveryTarget::Relay { turbo: self.turbo }
    }

    /// Submits the hex-encoded transaction. Nothing is retried.
    pub async fn submit(&self, raw: &[u8]) -> AttemptReport {
        let started = Instant::now();

        let sent = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, CBOR_CONTENT_TYPE)
            .body(hex::encode(raw))
            .send()
            .await;

        let result = match sent {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(_) if status.is_success() => DeliveryResult::Accepted,
                    Ok(body) => DeliveryResult::Rejected { status: status.as_u16(), body },
                    Err(e) => {
                        DeliveryResult::Transport(DeliveryError::from_relay(&e, self.timeout))
                    }
                }
            }
            Err(e) => DeliveryResult::Transport(DeliveryError::from_relay(&e, self.timeout)),
        };

        AttemptReport { elapsed: started.elapsed(), conn_reused: None, result }
    }
}
