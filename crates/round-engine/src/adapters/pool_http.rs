//! HTTP pool adapter: polls `getMiningInfo` and submits deadlines, with
//! failover across a primary URL and an ordered alternate list.

use crate::error::{Result, RoundEngineError};
use crate::ports::outbound::{MiningInfo, PoolClient, Submitter};
use async_trait::async_trait;
use serde::Deserialize;
use shared_types::{AccountId, Deadline};
use std::sync::Mutex;
use std::time::Duration;

/// Raw `getMiningInfo` response shape. The pool encodes `u64` fields as
/// strings, a Signum/Burstcoin convention that avoids JSON number precision
/// loss in browser clients.
#[derive(Debug, Deserialize)]
struct MiningInfoResponse {
    height: String,
    #[serde(rename = "baseTarget")]
    base_target: String,
    #[serde(rename = "generationSignature")]
    generation_signature: String,
    #[serde(rename = "targetDeadline")]
    target_deadline: Option<u64>,
}

fn parse_hex_gensig(hex: &str) -> Result<[u8; 32]> {
    if hex.len() != 64 {
        return Err(RoundEngineError::MalformedPoolResponse(format!(
            "generationSignature must be 64 hex chars, got {}",
            hex.len()
        )));
    }
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| RoundEngineError::MalformedPoolResponse(e.to_string()))?;
    }
    Ok(out)
}

/// Pool client that polls an ordered list of URLs, failing over on
/// transient error and resetting back to the primary on success.
pub struct HttpPoolClient {
    client: reqwest::Client,
    urls: Vec<String>,
    cursor: Mutex<usize>,
}

impl HttpPoolClient {
    /// Create a pool client over `urls`, primary first.
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builder with only a timeout never fails"),
            urls,
            cursor: Mutex::new(0),
        }
    }
}

#[async_trait]
impl PoolClient for HttpPoolClient {
    async fn poll(&self) -> Result<MiningInfo> {
        let start = {
            let cursor = self.cursor.lock().expect("cursor mutex poisoned");
            *cursor
        };

        let mut last_error = String::new();
        for offset in 0..self.urls.len() {
            let index = (start + offset) % self.urls.len();
            let url = &self.urls[index];

            match self.client.get(url).send().await {
                Ok(response) => match response.json::<MiningInfoResponse>().await {
                    Ok(parsed) => {
                        *self.cursor.lock().expect("cursor mutex poisoned") = index;
                        let height = parsed
                            .height
                            .parse::<u64>()
                            .map_err(|e| RoundEngineError::MalformedPoolResponse(e.to_string()))?;
                        let base_target = parsed
                            .base_target
                            .parse::<u64>()
                            .map_err(|e| RoundEngineError::MalformedPoolResponse(e.to_string()))?;
                        let generation_signature = parse_hex_gensig(&parsed.generation_signature)?;
                        return Ok(MiningInfo {
                            height,
                            base_target,
                            generation_signature,
                            pool_target_deadline: parsed.target_deadline.unwrap_or(0),
                        });
                    }
                    Err(e) => {
                        tracing::debug!(%url, error = %e, "malformed mining-info response");
                        last_error = e.to_string();
                    }
                },
                Err(e) => {
                    tracing::debug!(%url, error = %e, "pool poll failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(RoundEngineError::PoolUnreachable {
            attempted: self.urls.len(),
            last_error,
        })
    }
}

/// Submitter that POSTs a deadline's winning nonce to the pool, with
/// bounded exponential backoff on transient failure.
pub struct HttpSubmitter {
    client: reqwest::Client,
    urls: Vec<String>,
    max_attempts: u32,
}

const INITIAL_BACKOFF_MS: u64 = 500;
const BACKOFF_FACTOR: u64 = 2;
const MAX_BACKOFF_MS: u64 = 30_000;

impl HttpSubmitter {
    /// Create a submitter over `urls`, primary first, with the default
    /// 8-attempt bounded-backoff retry schedule.
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builder with only a timeout never fails"),
            urls,
            max_attempts: 8,
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, account_id: AccountId, height: u64, deadline: &Deadline) -> Result<()> {
        let url = self.urls.first().ok_or_else(|| {
            RoundEngineError::InvalidConfig("no submission URL configured".to_string())
        })?;

        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let result = self
                .client
                .post(format!("{url}?requestType=submitNonce"))
                .query(&[
                    ("accountId", account_id.to_string()),
                    ("nonce", deadline.nonce.to_string()),
                    ("blockheight", height.to_string()),
                ])
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    last_error = format!("pool returned status {}", response.status());
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * BACKOFF_FACTOR).min(MAX_BACKOFF_MS);
            }
        }

        Err(RoundEngineError::SubmissionExhausted {
            account_id,
            height,
            attempts: self.max_attempts,
            reason: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_gensig_rejects_wrong_length() {
        assert!(parse_hex_gensig("abcd").is_err());
    }

    #[test]
    fn test_parse_hex_gensig_roundtrips() {
        let hex = "00".repeat(32);
        let parsed = parse_hex_gensig(&hex).unwrap();
        assert_eq!(parsed, [0u8; 32]);
    }

    #[test]
    fn test_backoff_schedule_caps_at_max() {
        let mut backoff = INITIAL_BACKOFF_MS;
        for _ in 0..10 {
            backoff = (backoff * BACKOFF_FACTOR).min(MAX_BACKOFF_MS);
        }
        assert_eq!(backoff, MAX_BACKOFF_MS);
    }
}
