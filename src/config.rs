use std::time::Duration;

#[cfg(feature = "json")]
use serde::Deserialize;

use crate::constants;

/// What to do when a single line of the portal page grows past the maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(Deserialize), serde(rename_all = "lowercase"))]
pub enum LineOverflow {
    /// Keep the first `max_line_length` bytes and drop the rest of the line.
    #[default]
    Truncate,
    /// Abort the fetch with [`Error::LineTooLong`](crate::Error::LineTooLong).
    Fail,
}

/// Credentials of the network the portal sits behind.
///
/// Association itself is left to the platform network stack; the session only
/// carries these so one file configures the whole device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Deserialize))]
pub struct NetworkCredentials {
    pub ssid: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub password: String,
}

/// Session configuration.
///
/// The four endpoints are required; everything else has a default and can be
/// adjusted with the builder-style setters.
///
/// # Examples
///
/// ```
/// use captive_relay::Config;
/// use std::time::Duration;
///
/// let config = Config::new(
///     "http://portal.local/en/connecttoweb",
///     "http://portal.local/assets/media/fis/combined.json",
///     "http://collector.local/ingest",
///     "secret",
/// )
/// .retry_delay(Duration::from_secs(2))
/// .line_capacity(20);
///
/// assert_eq!(config.retry_delay, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Deserialize))]
pub struct Config {
    #[cfg_attr(feature = "json", serde(default))]
    pub network: Option<NetworkCredentials>,
    pub portal_url: String,
    pub telemetry_url: String,
    pub endpoint_url: String,
    #[cfg_attr(feature = "json", serde(default))]
    pub api_key: String,
    /// Literal that marks the start of the login form. Derived from
    /// `portal_url` when not set.
    #[cfg_attr(feature = "json", serde(default))]
    pub form_action: Option<String>,
    #[cfg_attr(
        feature = "json",
        serde(rename = "fetch_interval_ms", default = "defaults::fetch_interval", with = "millis")
    )]
    pub fetch_interval: Duration,
    #[cfg_attr(
        feature = "json",
        serde(rename = "retry_delay_ms", default = "defaults::retry_delay", with = "millis")
    )]
    pub retry_delay: Duration,
    #[cfg_attr(
        feature = "json",
        serde(rename = "transport_timeout_ms", default = "defaults::transport_timeout", with = "millis")
    )]
    pub transport_timeout: Duration,
    #[cfg_attr(
        feature = "json",
        serde(rename = "idle_delay_ms", default = "defaults::idle_delay", with = "millis")
    )]
    pub idle_delay: Duration,
    #[cfg_attr(feature = "json", serde(default = "defaults::line_capacity"))]
    pub line_capacity: usize,
    #[cfg_attr(feature = "json", serde(default = "defaults::max_line_length"))]
    pub max_line_length: usize,
    #[cfg_attr(feature = "json", serde(default))]
    pub line_overflow: LineOverflow,
    #[cfg_attr(feature = "json", serde(default = "defaults::max_payload_size"))]
    pub max_payload_size: usize,
}

impl Config {
    /// Creates a configuration with default timings and limits.
    pub fn new<P, T, E, K>(portal_url: P, telemetry_url: T, endpoint_url: E, api_key: K) -> Config
    where
        P: Into<String>,
        T: Into<String>,
        E: Into<String>,
        K: Into<String>,
    {
        Config {
            network: None,
            portal_url: portal_url.into(),
            telemetry_url: telemetry_url.into(),
            endpoint_url: endpoint_url.into(),
            api_key: api_key.into(),
            form_action: None,
            fetch_interval: constants::DEFAULT_FETCH_INTERVAL,
            retry_delay: constants::DEFAULT_RETRY_DELAY,
            transport_timeout: constants::DEFAULT_TRANSPORT_TIMEOUT,
            idle_delay: constants::DEFAULT_IDLE_DELAY,
            line_capacity: constants::DEFAULT_LINE_CAPACITY,
            max_line_length: constants::DEFAULT_MAX_LINE_LENGTH,
            line_overflow: LineOverflow::default(),
            max_payload_size: constants::DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Parses a configuration from `JSON`. Durations are given in milliseconds
    /// under `*_ms` keys.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> crate::Result<Config> {
        serde_json::from_str(json).map_err(crate::Error::DecodeJson)
    }

    /// Reads and parses a `JSON` configuration file.
    #[cfg(feature = "json")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Config> {
        let json = std::fs::read_to_string(path).map_err(crate::Error::ReadConfig)?;
        Config::from_json(&json)
    }

    /// Sets the network credentials.
    pub fn network<S: Into<String>, W: Into<String>>(mut self, ssid: S, password: W) -> Config {
        self.network = Some(NetworkCredentials {
            ssid: ssid.into(),
            password: password.into(),
        });
        self
    }

    /// Overrides the literal that opens the login form.
    pub fn form_action<S: Into<String>>(mut self, marker: S) -> Config {
        self.form_action = Some(marker.into());
        self
    }

    /// Sets how often telemetry is relayed once logged in.
    pub fn fetch_interval(mut self, interval: Duration) -> Config {
        self.fetch_interval = interval;
        self
    }

    /// Sets the delay before a failed portal fetch is retried.
    pub fn retry_delay(mut self, delay: Duration) -> Config {
        self.retry_delay = delay;
        self
    }

    /// Sets the per-request timeout of the transport.
    pub fn transport_timeout(mut self, timeout: Duration) -> Config {
        self.transport_timeout = timeout;
        self
    }

    /// Sets the pause between two control loop iterations.
    pub fn idle_delay(mut self, delay: Duration) -> Config {
        self.idle_delay = delay;
        self
    }

    /// Sets how many completed lines of the portal page are retained.
    pub fn line_capacity(mut self, capacity: usize) -> Config {
        self.line_capacity = capacity;
        self
    }

    /// Sets the maximum length of one line, and what happens beyond it.
    pub fn max_line_length(mut self, limit: usize, overflow: LineOverflow) -> Config {
        self.max_line_length = limit;
        self.line_overflow = overflow;
        self
    }

    /// Sets the maximum size of a relayed telemetry document.
    pub fn max_payload_size(mut self, limit: usize) -> Config {
        self.max_payload_size = limit;
        self
    }

    /// The literal that opens the login form.
    pub fn form_action_marker(&self) -> String {
        self.form_action
            .clone()
            .unwrap_or_else(|| constants::form_action_marker(&self.portal_url))
    }
}

#[cfg(feature = "json")]
mod defaults {
    use std::time::Duration;

    use crate::constants;

    pub(super) fn fetch_interval() -> Duration {
        constants::DEFAULT_FETCH_INTERVAL
    }

    pub(super) fn retry_delay() -> Duration {
        constants::DEFAULT_RETRY_DELAY
    }

    pub(super) fn transport_timeout() -> Duration {
        constants::DEFAULT_TRANSPORT_TIMEOUT
    }

    pub(super) fn idle_delay() -> Duration {
        constants::DEFAULT_IDLE_DELAY
    }

    pub(super) fn line_capacity() -> usize {
        constants::DEFAULT_LINE_CAPACITY
    }

    pub(super) fn max_line_length() -> usize {
        constants::DEFAULT_MAX_LINE_LENGTH
    }

    pub(super) fn max_payload_size() -> usize {
        constants::DEFAULT_MAX_PAYLOAD_SIZE
    }
}

#[cfg(feature = "json")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new(
            "http://portal.local/en/connecttoweb",
            "http://portal.local/combined.json",
            "http://collector.local/ingest",
            "key",
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();

        assert_eq!(config.fetch_interval, Duration::from_secs(10));
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.transport_timeout, Duration::from_secs(10));
        assert_eq!(config.line_capacity, 10);
        assert_eq!(config.line_overflow, LineOverflow::Truncate);
        assert_eq!(
            config.form_action_marker(),
            r#"action="http://portal.local/en/connecttoweb""#
        );
    }

    #[test]
    fn test_builder() {
        let config = config()
            .network("Railnet", "")
            .form_action(r#"action="/login""#)
            .max_line_length(128, LineOverflow::Fail)
            .max_payload_size(1024);

        assert_eq!(config.network.as_ref().map(|n| n.ssid.as_str()), Some("Railnet"));
        assert_eq!(config.form_action_marker(), r#"action="/login""#);
        assert_eq!(config.max_line_length, 128);
        assert_eq!(config.line_overflow, LineOverflow::Fail);
        assert_eq!(config.max_payload_size, 1024);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json() {
        let json = r#"{
            "network": { "ssid": "Railnet" },
            "portal_url": "http://portal.local/en/connecttoweb",
            "telemetry_url": "http://portal.local/combined.json",
            "endpoint_url": "http://collector.local/ingest",
            "api_key": "key",
            "retry_delay_ms": 2500,
            "line_overflow": "fail"
        }"#;

        let config = Config::from_json(json).unwrap();

        assert_eq!(config.retry_delay, Duration::from_millis(2500));
        assert_eq!(config.fetch_interval, Duration::from_secs(10));
        assert_eq!(config.line_overflow, LineOverflow::Fail);
        assert_eq!(config.network.unwrap().password, "");
        assert_eq!(config.max_payload_size, 256 * 1024);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json_missing_url() {
        let err = Config::from_json(r#"{ "portal_url": "http://portal.local" }"#).unwrap_err();
        assert!(err.to_string().starts_with("failed to decode configuration as JSON"));
    }
}
