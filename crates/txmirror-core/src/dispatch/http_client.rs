use bytes::Bytes;
use http::{header::CONTENT_TYPE, Request, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use std::time::{Duration, Instant};

use super::{
    connection::{ConnectionCapture, TrackingConnector},
    errors::DeliveryError,
    outcome::DeliveryResult,
};
use crate::config::PoolConfig;

pub const CBOR_CONTENT_TYPE: &str = "application/cbor";

type PooledClient = Client<TrackingConnector<HttpsConnector<HttpConnector>>, Full<Bytes>>;

/// What a single attempt produced, before it is attributed to a transaction.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub elapsed: Duration,
    pub conn_reused: Option<bool>,
    pub result: DeliveryResult,
}

/// Pooled HTTP client shared by every backend delivery.
///
/// Cloning is cheap and every clone uses the same connection pool. Connections are
/// tagged by [`TrackingConnector`] so each attempt can report whether it reused one.
#[derive(Clone)]
pub struct BackendClient {
    client: PooledClient,
    timeout: Duration,
}

impl BackendClient {
    /// Builds the client from pool settings and the per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::ClientBuild`] if the TLS configuration cannot be created.
    pub fn new(pool: &PoolConfig, timeout: Duration) -> Result<Self, DeliveryError> {
        let handshake_timeout = Duration::from_secs(pool.handshake_timeout_secs);

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(handshake_timeout));

        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build backend tls config");
                DeliveryError::ClientBuild(e.to_string())
            })?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(TrackingConnector::new(https, handshake_timeout));

        Ok(Self { client, timeout })
    }

    /// Posts `raw` to `target` and drains the response.
    ///
    /// The client timeout bounds the whole attempt, from connecting to reading the last
    /// body byte. Nothing is retried.
    pub async fn submit(&self, target: &Uri, raw: Bytes) -> AttemptReport {
        let started = Instant::now();

        let mut request = match Request::post(target.clone())
            .header(CONTENT_TYPE, CBOR_CONTENT_TYPE)
            .body(Full::new(raw))
        {
            Ok(request) => request,
            Err(e) => {
                return AttemptReport {
                    elapsed: started.elapsed(),
                    conn_reused: None,
                    result: DeliveryResult::Transport(DeliveryError::Request(e.to_string())),
                };
            }
        };

        let capture = ConnectionCapture::attach(&mut request);
        let mut observed = None;

        let exchange = tokio::time::timeout(self.timeout, async {
            let sent = self.client.request(request).await;
            observed = Some(capture.observe());
            match sent {
                Ok(response) => drain(response).await,
                Err(e) => DeliveryResult::Transport(DeliveryError::from_backend(&e)),
            }
        })
        .await;

        let result = exchange
            .unwrap_or_else(|_| DeliveryResult::Transport(DeliveryError::Timeout(self.timeout)));
        let conn_reused = observed.unwrap_or_else(|| capture.observe());

        AttemptReport { elapsed: started.elapsed(), conn_reused, result }
    }
}

async fn drain(response: Response<Incoming>) -> DeliveryResult {
    let status = response.status();
    let body = match response.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return DeliveryResult::Transport(DeliveryError::Body(e.to_string())),
    };

    if status == StatusCode::ACCEPTED {
        DeliveryResult::Accepted
    } else {
        DeliveryResult::Rejected {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}
