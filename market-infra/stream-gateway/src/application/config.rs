use market_core::Price;
use std::time::Duration;

use crate::presentation::DEFAULT_QUEUE_CAPACITY;

use super::retry::RetryPolicy;

/// Configuration for one streaming client
/// Application-level configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Websocket endpoint of the exchange
    pub endpoint: String,
    /// Connect / reconnect budget
    pub retry: RetryPolicy,
    /// Bound of each topic's dispatch queue
    pub queue_capacity: usize,
    /// Price precision requested by `subscribe_depth`
    pub depth_precision: Price,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            retry: RetryPolicy::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            depth_precision: Price::from_raw(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Shorthand for a policy with the default backoff ceiling
    pub fn with_retry_attempts(mut self, max_attempts: u32, initial_delay: Duration) -> Self {
        self.retry = RetryPolicy::new(max_attempts, initial_delay);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_depth_precision(mut self, precision: Price) -> Self {
        self.depth_precision = precision;
        self
    }
}
