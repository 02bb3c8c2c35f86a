//! # Geowarden Probe
//!
//! HTTP health probing for the supervised process. A probe never blocks
//! longer than its configured timeout; an unreachable or slow endpoint
//! yields an unhealthy outcome (or a `ProbeTimeout` error the caller folds
//! into an `Unhealthy` status), never a hard failure of the supervisor.

use chrono::{DateTime, Utc};
use geowarden_common::{Result, SupervisorError};
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// HTTP health probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: String,
    pub timeout: Duration,
    pub expected_status: Vec<u16>,
}

impl ProbeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(2),
            expected_status: vec![200],
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_expected_status(mut self, status_codes: Vec<u16>) -> Self {
        self.expected_status = status_codes;
        self
    }
}

/// Outcome of a single probe. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProbeOutcome {
    /// Outcome for a probe that could not be performed at all.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            checked_at: Utc::now(),
            response_time_ms: 0,
            message: Some(message.into()),
        }
    }
}

/// Perform a GET probe against the configured health endpoint.
///
/// Connection failures are reported as an unhealthy outcome. A probe that
/// exceeds its timeout returns `ProbeTimeout`; a URL that cannot be parsed
/// returns `InvalidConfig`.
pub async fn probe_http(config: &ProbeConfig) -> Result<ProbeOutcome> {
    let start = std::time::Instant::now();

    debug!(url = %config.url, "starting health probe");

    let uri: Uri = config.url.parse().map_err(|e| {
        SupervisorError::invalid_config(format!("invalid health check url {}: {}", config.url, e))
    })?;

    let client = Client::builder(TokioExecutor::new()).build_http();

    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("User-Agent", "geowarden/0.1")
        .body(Empty::<Bytes>::new())
        .map_err(|e| {
            SupervisorError::invalid_config(format!("failed to build probe request: {}", e))
        })?;

    let response = match timeout(config.timeout, client.request(request)).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!(url = %config.url, error = %e, "health probe connection failed");
            return Ok(ProbeOutcome {
                healthy: false,
                checked_at: Utc::now(),
                response_time_ms: start.elapsed().as_millis() as u64,
                message: Some(format!("connection failed: {}", e)),
            });
        }
        Err(_) => {
            return Err(SupervisorError::ProbeTimeout {
                url: config.url.clone(),
                timeout: config.timeout,
            });
        }
    };

    let status = response.status();
    let elapsed = start.elapsed().as_millis() as u64;
    let healthy = config.expected_status.contains(&status.as_u16());

    debug!(
        url = %config.url,
        %status,
        healthy,
        elapsed_ms = elapsed,
        "health probe complete"
    );

    Ok(ProbeOutcome {
        healthy,
        checked_at: Utc::now(),
        response_time_ms: elapsed,
        message: if healthy {
            None
        } else {
            Some(format!("unexpected status code: {}", status))
        },
    })
}
