use std::path::Path;
use thiserror::Error;
use url::Url;

use super::types::{ExchangeConfig, StreamConfigFile};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No enabled exchanges in config")]
    NoEnabledExchanges,
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(String),
    #[error("Invalid websocket URL for {exchange}: {reason}")]
    InvalidUrl { exchange: String, reason: String },
    #[error("Invalid symbol for {exchange}: {reason}")]
    InvalidSymbol { exchange: String, reason: String },
    #[error("Dispatch queue capacity must be at least 1")]
    InvalidQueueCapacity,
    #[error("No known protocol for exchange {0}; set \"protocol\"")]
    UnknownProtocol(String),
    #[error("Invalid depth precision for {exchange}: {reason}")]
    InvalidPrecision { exchange: String, reason: String },
}

/// Load stream configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StreamConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: StreamConfigFile = serde_json::from_str(&content)?;
    Ok(config)
}

/// Parse configuration held in memory
pub fn load_config_from_str(json: &str) -> Result<StreamConfigFile, ConfigError> {
    let config: StreamConfigFile = serde_json::from_str(json)?;
    Ok(config)
}

/// Configuration compiled into the binary (`stream_config.json`)
pub fn load_default_config() -> Result<StreamConfigFile, ConfigError> {
    load_config_from_str(include_str!("stream_config.json"))
}

impl StreamConfigFile {
    /// Exchanges the gateway should open a feed for
    pub fn enabled_exchanges(&self) -> Vec<&ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled).collect()
    }

    pub fn get_exchange(&self, id: &str) -> Result<&ExchangeConfig, ConfigError> {
        self.exchanges
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ConfigError::ExchangeNotFound(id.to_string()))
    }

    /// Reject configs that could never produce a working feed
    pub fn validate(&self) -> Result<(), ConfigError> {
        let enabled = self.enabled_exchanges();
        if enabled.is_empty() {
            return Err(ConfigError::NoEnabledExchanges);
        }

        if self.global.dispatch.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }

        for exchange in enabled {
            validate_ws_url(exchange)?;
            exchange.pairs().map_err(|e| ConfigError::InvalidSymbol {
                exchange: exchange.id.clone(),
                reason: e.to_string(),
            })?;
            exchange.protocol_kind()?;
            exchange.depth_precision()?;
        }

        Ok(())
    }
}

fn validate_ws_url(exchange: &ExchangeConfig) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        exchange: exchange.id.clone(),
        reason,
    };

    let url = Url::parse(&exchange.ws_url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_is_valid() {
        load_default_config().unwrap().validate().unwrap();
    }

    #[test]
    fn test_disabled_exchanges_get_no_feed() {
        let config = load_default_config().unwrap();
        let ids: Vec<&str> = config.enabled_exchanges().iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&"gateio"));
        assert!(!ids.contains(&"local"));
    }

    #[test]
    fn test_lookup_by_id() {
        let config = load_default_config().unwrap();
        assert_eq!(config.get_exchange("gateio").unwrap().name, "Gate.io");
        assert!(matches!(
            config.get_exchange("nope"),
            Err(ConfigError::ExchangeNotFound(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "ws_url": "https://example.com"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));

        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "ws_url": "not a url"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_symbol_and_capacity() {
        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "ws_url": "wss://a.b", "symbols": ["???"]}]}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSymbol { .. })));

        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "ws_url": "wss://a.b"}],
                "global": {"dispatch": {"queue_capacity": 0}}}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidQueueCapacity)));
    }

    #[test]
    fn test_validate_rejects_unknown_protocol_and_bad_precision() {
        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "ws_url": "wss://a.b"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownProtocol(_))));

        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "ws_url": "wss://a.b",
                "protocol": "gateio", "depth_precision": "-0.1"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPrecision { .. })));
    }

    #[test]
    fn test_validate_requires_enabled_exchange() {
        let config = load_config_from_str(
            r#"{"exchanges": [{"id": "x", "name": "X", "enabled": false, "ws_url": "wss://a.b"}]}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::NoEnabledExchanges)));
    }
}
