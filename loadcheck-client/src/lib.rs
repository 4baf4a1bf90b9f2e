use loadcheck_common::{LoadCheckError, Result};
use std::time::{Duration, Instant};

/// Probe configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target_url: String,
    /// Upper bound on one request, connect to last body byte.
    pub timeout: Duration,
}

/// Raw facts about one completed request attempt.
///
/// `status_code` is 0 when the request never produced a response
/// (connection refused, timeout, DNS failure, mid-body transport error).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub status_code: u16,
    pub body_size: usize,
    pub duration_ms: f64,
}

impl Sample {
    /// Transport-level failure: no usable response was received.
    pub fn is_transport_failure(&self) -> bool {
        self.status_code == 0
    }
}

/// Measurement instrument: issues one GET per call against a fixed target.
pub struct Probe {
    config: ProbeConfig,
    http_client: reqwest::Client,
}

impl Probe {
    /// Build a probe with the configured per-request timeout.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LoadCheckError::HttpClient(e.to_string()))?;
        Ok(Self { config, http_client })
    }

    pub fn target_url(&self) -> &str {
        &self.config.target_url
    }

    /// Issue one GET and measure wall-clock duration from send to full-body
    /// receipt. Never returns an error: a transport failure is itself a
    /// measurement and comes back as a `status_code = 0` sample.
    pub async fn fetch_once(&self) -> Sample {
        let start = Instant::now();

        let response = self
            .http_client
            .get(&self.config.target_url)
            .header("Accept", "application/json")
            .header("Cache-Control", "no-cache")
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(_) => return transport_failure(start),
        };

        let status_code = response.status().as_u16();

        // Read the body to the end so the duration covers full receipt; the
        // body's schema is irrelevant, only its length is recorded.
        match response.bytes().await {
            Ok(body) => Sample {
                status_code,
                body_size: body.len(),
                duration_ms: elapsed_ms(start),
            },
            Err(_) => transport_failure(start),
        }
    }
}

fn transport_failure(start: Instant) -> Sample {
    Sample {
        status_code: 0,
        body_size: 0,
        duration_ms: elapsed_ms(start),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
