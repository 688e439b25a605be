use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The reference flush window: at most one batch per stream every 50ms.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
	/// A stream delivers its buffered payloads once more than this much time has passed since its last batch.
	///
	/// Checked only when a payload arrives; a stream that goes quiet keeps its remainder until the next one.
	#[serde(with = "humantime_serde")]
	pub flush_interval: Duration,
}

impl Config {
	pub fn with_flush_interval(flush_interval: Duration) -> Self {
		Self { flush_interval }
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			flush_interval: DEFAULT_FLUSH_INTERVAL,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default() {
		assert_eq!(Config::default().flush_interval, Duration::from_millis(50));
	}

	#[test]
	fn test_parse_humantime() {
		let config: Config = serde_json::from_str(r#"{ "flush_interval": "20ms" }"#).unwrap();
		assert_eq!(config, Config::with_flush_interval(Duration::from_millis(20)));
	}

	#[test]
	fn test_parse_empty() {
		let config: Config = serde_json::from_str("{}").unwrap();
		assert_eq!(config, Config::default());
	}

	#[test]
	fn test_unknown_field() {
		let res = serde_json::from_str::<Config>(r#"{ "flush": "20ms" }"#);
		assert!(res.is_err());
	}
}
