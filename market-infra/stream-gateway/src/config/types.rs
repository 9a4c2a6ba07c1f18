use market_core::{CurrencyPair, KlineInterval, Price, ValueError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::application::{ClientConfig, RetryPolicy, StreamClient};
use crate::domain::Connector;
use crate::infrastructure::{CobinhoodProtocol, GateIoProtocol};

use super::loader::ConfigError;

/// Wire protocol an exchange endpoint speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Gateio,
    Cobinhood,
}

impl ProtocolKind {
    /// Protocol implied by a well-known exchange id
    pub fn from_exchange_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "gateio" | "gate.io" => Some(ProtocolKind::Gateio),
            "cobinhood" => Some(ProtocolKind::Cobinhood),
            _ => None,
        }
    }

    /// Depth precision used when the exchange entry does not set one
    pub fn default_depth_precision(&self) -> Price {
        match self {
            ProtocolKind::Gateio => Price::from_raw(1),
            ProtocolKind::Cobinhood => Price::from_raw(10),
        }
    }
}

/// Root configuration for the stream gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfigFile {
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub global: GlobalConfig,
}

/// Configuration for a single exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Unique identifier for the exchange (e.g., "gateio")
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether this exchange is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// WebSocket URL
    pub ws_url: String,
    /// Pairs to subscribe to ("BTC_USDT", "ethusdt", ...)
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Order book depth requested per pair
    #[serde(default = "default_depth_levels")]
    pub depth_levels: u32,
    /// Candle stream to open per pair, if any
    #[serde(default)]
    pub kline_interval: Option<KlineInterval>,
    /// Wire protocol; inferred from `id` when absent
    #[serde(default)]
    pub protocol: Option<ProtocolKind>,
    /// Order book price grouping, e.g. "0.0000001"
    #[serde(default)]
    pub depth_precision: Option<String>,
}

impl ExchangeConfig {
    /// Parse the configured symbols into pairs
    pub fn pairs(&self) -> Result<Vec<CurrencyPair>, ValueError> {
        self.symbols.iter().map(|s| CurrencyPair::parse(s)).collect()
    }

    pub fn protocol_kind(&self) -> Result<ProtocolKind, ConfigError> {
        self.protocol
            .or_else(|| ProtocolKind::from_exchange_id(&self.id))
            .ok_or_else(|| ConfigError::UnknownProtocol(self.id.clone()))
    }

    /// Configured depth precision, or the protocol's default
    pub fn depth_precision(&self) -> Result<Price, ConfigError> {
        match &self.depth_precision {
            Some(text) => Price::parse(text).map_err(|e| ConfigError::InvalidPrecision {
                exchange: self.id.clone(),
                reason: e.to_string(),
            }),
            None => Ok(self.protocol_kind()?.default_depth_precision()),
        }
    }

    /// Convert to application-layer ClientConfig
    pub fn to_client_config(&self, global: &GlobalConfig) -> ClientConfig {
        ClientConfig::new(self.ws_url.clone())
            .with_retry(global.retry.to_policy())
            .with_queue_capacity(global.dispatch.queue_capacity)
    }

    /// Build a client speaking this exchange's protocol
    pub fn build_client(
        &self,
        global: &GlobalConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<StreamClient, ConfigError> {
        let config = self
            .to_client_config(global)
            .with_depth_precision(self.depth_precision()?);

        let client = match self.protocol_kind()? {
            ProtocolKind::Gateio => StreamClient::new(config, connector, Arc::new(GateIoProtocol::new())),
            ProtocolKind::Cobinhood => {
                StreamClient::new(config, connector, Arc::new(CobinhoodProtocol::new()))
            }
        };
        Ok(client)
    }
}

/// Connect / reconnect budget (JSON representation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfigJson {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfigJson {
    fn default() -> Self {
        RetryConfigJson {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryConfigJson {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Dispatch bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfigJson {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfigJson {
    fn default() -> Self {
        DispatchConfigJson {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Global configuration that applies to all exchanges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub retry: RetryConfigJson,
    #[serde(default)]
    pub dispatch: DispatchConfigJson,
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_depth_levels() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    5000
}

fn default_max_delay() -> u64 {
    60000
}

fn default_queue_capacity() -> usize {
    16
}
