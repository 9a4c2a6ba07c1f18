use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueError;

/// Candle width of a kline stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KlineInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl KlineInterval {
    pub const ALL: [KlineInterval; 8] = [
        KlineInterval::OneMinute,
        KlineInterval::FiveMinutes,
        KlineInterval::FifteenMinutes,
        KlineInterval::ThirtyMinutes,
        KlineInterval::OneHour,
        KlineInterval::FourHours,
        KlineInterval::OneDay,
        KlineInterval::OneWeek,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            KlineInterval::OneMinute => 1,
            KlineInterval::FiveMinutes => 5,
            KlineInterval::FifteenMinutes => 15,
            KlineInterval::ThirtyMinutes => 30,
            KlineInterval::OneHour => 60,
            KlineInterval::FourHours => 240,
            KlineInterval::OneDay => 1440,
            KlineInterval::OneWeek => 10080,
        }
    }

    pub fn seconds(&self) -> u64 {
        self.minutes() as u64 * 60
    }

    /// Look up the interval with the given width in seconds
    pub fn from_seconds(seconds: u64) -> Result<Self, ValueError> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.seconds() == seconds)
            .ok_or_else(|| ValueError::UnsupportedInterval(format!("{}s", seconds)))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMinute => "1m",
            KlineInterval::FiveMinutes => "5m",
            KlineInterval::FifteenMinutes => "15m",
            KlineInterval::ThirtyMinutes => "30m",
            KlineInterval::OneHour => "1h",
            KlineInterval::FourHours => "4h",
            KlineInterval::OneDay => "1d",
            KlineInterval::OneWeek => "1w",
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KlineInterval {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| ValueError::UnsupportedInterval(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_widths() {
        assert_eq!(KlineInterval::OneMinute.seconds(), 60);
        assert_eq!(KlineInterval::FourHours.minutes(), 240);
        assert_eq!(
            KlineInterval::from_seconds(3600).unwrap(),
            KlineInterval::OneHour
        );
        assert!(KlineInterval::from_seconds(42).is_err());
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("15m".parse::<KlineInterval>().unwrap(), KlineInterval::FifteenMinutes);
        assert!("2m".parse::<KlineInterval>().is_err());
        assert_eq!(
            serde_json::to_string(&KlineInterval::OneDay).unwrap(),
            "\"1d\""
        );
    }
}
