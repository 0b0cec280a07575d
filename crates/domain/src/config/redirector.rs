use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shape of the `<result>` field of a redirect reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// `http://block.local/x`
    #[default]
    BareUrl,
    /// `302:http://block.local/x`
    StatusPrefixed,
}

/// Dispatcher and worker pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectorConfig {
    /// Number of workers, each with its own store connection (default: 1).
    /// 0 classifies requests inline in the reader loop.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requests that may wait in the queue before intake blocks (default: 64)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub response_format: ResponseFormat,

    /// Status used by `status-prefixed` replies (default: 302)
    #[serde(default = "default_redirect_status")]
    pub redirect_status: u16,

    /// Upper bound for one policy store round trip (default: 5000)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl RedirectorConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for RedirectorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            response_format: ResponseFormat::default(),
            redirect_status: default_redirect_status(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    64
}

fn default_redirect_status() -> u16 {
    302
}

fn default_query_timeout_ms() -> u64 {
    5_000
}
