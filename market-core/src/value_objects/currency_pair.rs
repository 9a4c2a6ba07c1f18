use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueError;

/// Quote assets recognised when a symbol carries no separator, longest first
const KNOWN_QUOTES: [&str; 5] = ["USDT", "ETH", "BTC", "BNB", "HT"];

/// A trading pair such as BTC/USDT
///
/// Both legs are stored upper-case so `ethusdt`, `ETH_USDT` and `eth/usdt`
/// all name the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        CurrencyPair {
            base: base.as_ref().to_uppercase(),
            quote: quote.as_ref().to_uppercase(),
        }
    }

    /// Parse a pair from one of: `ethusdt`, `NEOETH`, `zil/eth`, `blz_eth`, `COB-ETH`
    pub fn parse(symbol: &str) -> Result<Self, ValueError> {
        let upper = symbol.trim().to_uppercase();

        let legs: Vec<&str> = upper
            .split(['/', '_', '-'])
            .filter(|leg| !leg.is_empty())
            .collect();
        if legs.len() == 2 {
            return Ok(CurrencyPair::new(legs[0], legs[1]));
        }
        if legs.len() == 1 {
            for quote in KNOWN_QUOTES {
                if let Some(base) = upper.strip_suffix(quote)
                    && !base.is_empty()
                {
                    return Ok(CurrencyPair::new(base, quote));
                }
            }
        }

        Err(ValueError::UnsupportedPair(symbol.to_string()))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Join base and quote with a separator, e.g. `to_symbol("_")` gives `BTC_USDT`
    pub fn to_symbol(&self, sep: &str) -> String {
        format!("{}{}{}", self.base, sep, self.quote)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

impl std::str::FromStr for CurrencyPair {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyPair::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let expected = CurrencyPair::new("eth", "usdt");
        assert_eq!(CurrencyPair::parse("ethusdt").unwrap(), expected);
        assert_eq!(CurrencyPair::parse("ETH_USDT").unwrap(), expected);
        assert_eq!(CurrencyPair::parse("eth/usdt").unwrap(), expected);

        assert_eq!(
            CurrencyPair::parse("NEOETH").unwrap(),
            CurrencyPair::new("NEO", "ETH")
        );
        assert_eq!(
            CurrencyPair::parse("blz_eth").unwrap(),
            CurrencyPair::new("BLZ", "ETH")
        );
        assert_eq!(
            CurrencyPair::parse("COB-ETH").unwrap(),
            CurrencyPair::new("COB", "ETH")
        );
    }

    #[test]
    fn test_parse_unsupported() {
        assert!(CurrencyPair::parse("FOOBAR").is_err());
        assert!(CurrencyPair::parse("USDT").is_err());
        assert!(CurrencyPair::parse("a_b_c").is_err());
    }

    #[test]
    fn test_symbol_rendering() {
        let pair = CurrencyPair::new("btc", "usdt");
        assert_eq!(pair.to_symbol("_"), "BTC_USDT");
        assert_eq!(pair.to_symbol("-"), "BTC-USDT");
        assert_eq!(pair.to_string(), "BTCUSDT");
    }
}
