use core::fmt;

use embedded_time::duration::Milliseconds;
use serde::Deserialize;

use crate::time::{Millis, Timeout};

/// Gateway host used when none is configured
pub const DEFAULT_HOST: &str = "localhost";

/// IANA-assigned CoAP port
pub const DEFAULT_COAP_PORT: u16 = 5683;

/// How long exchanges wait for a response by default
pub const DEFAULT_TIMEOUT: Timeout = Timeout::secs(5);

/// How long observations are requested to live by default
pub const DEFAULT_TTL: Millis = Milliseconds(300_000);

/// Errors encounterable loading [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// The document was not valid JSON, or a value had the wrong type
  Json(String),
  /// Port `0` cannot be used to reach a gateway
  InvalidPort,
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Json(e) => write!(f, "invalid config: {}", e),
      | Self::InvalidPort => write!(f, "invalid config: port must be nonzero"),
    }
  }
}

impl std::error::Error for Error {}

/// Where the gateway lives & how long to wait on it.
///
/// Read once when a [`Client`](crate::client::Client) is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Hostname or IP address of the gateway
  ///
  /// ```
  /// use toad_device::config::Config;
  ///
  /// assert_eq!(Config::default().host, "localhost");
  /// ```
  pub host: String,
  /// UDP port the gateway listens on
  ///
  /// ```
  /// use toad_device::config::Config;
  ///
  /// assert_eq!(Config::default().port, 5683);
  /// ```
  pub port: u16,
  /// Default exchange timeout
  ///
  /// ```
  /// use toad_device::config::Config;
  /// use toad_device::time::Timeout;
  ///
  /// assert_eq!(Config::default().timeout, Timeout::Millis(5_000));
  /// ```
  pub timeout: Timeout,
  /// Default lifetime requested for observations
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use toad_device::config::Config;
  ///
  /// assert_eq!(Config::default().ttl, Milliseconds(300_000u64));
  /// ```
  pub ttl: Millis,
}

impl Default for Config {
  fn default() -> Self {
    Config { host: DEFAULT_HOST.into(),
             port: DEFAULT_COAP_PORT,
             timeout: DEFAULT_TIMEOUT,
             ttl: DEFAULT_TTL }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Raw {
  host: Option<String>,
  port: Option<u16>,
  timeout_ms: Option<u64>,
  ttl_ms: Option<u64>,
}

impl Config {
  /// Load the gateway section of a JSON config document.
  ///
  /// Missing keys take their default values.
  ///
  /// ```
  /// use toad_device::config::Config;
  /// use toad_device::time::Timeout;
  ///
  /// let cfg = Config::from_json(r#"{"host": "gateway.local", "timeoutMs": 750}"#).unwrap();
  /// assert_eq!(cfg.host, "gateway.local");
  /// assert_eq!(cfg.port, 5683);
  /// assert_eq!(cfg.timeout, Timeout::Millis(750));
  /// ```
  pub fn from_json(text: &str) -> Result<Self, Error> {
    let raw = serde_json::from_str::<Raw>(text).map_err(|e| Error::Json(e.to_string()))?;
    let dflt = Self::default();

    let port = raw.port.unwrap_or(dflt.port);
    if port == 0 {
      return Err(Error::InvalidPort);
    }

    Ok(Config { host: raw.host.unwrap_or(dflt.host),
                port,
                timeout: raw.timeout_ms.map(Timeout::Millis).unwrap_or(dflt.timeout),
                ttl: raw.ttl_ms.map(Milliseconds).unwrap_or(dflt.ttl) })
  }

  /// The URI resources on the gateway are addressed relative to
  ///
  /// ```
  /// use toad_device::config::Config;
  ///
  /// assert_eq!(Config::default().uri(), "coap://localhost:5683/");
  /// ```
  pub fn uri(&self) -> String {
    format!("coap://{}:{}/", self.host, self.port)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn empty_document_is_default() {
    assert_eq!(Config::from_json("{}"), Ok(Config::default()));
  }

  #[test]
  fn rejects_port_zero() {
    assert_eq!(Config::from_json(r#"{"port": 0}"#), Err(Error::InvalidPort));
  }

  #[test]
  fn rejects_wrong_types() {
    assert!(matches!(Config::from_json(r#"{"port": "five"}"#), Err(Error::Json(_))));
    assert!(matches!(Config::from_json("not json"), Err(Error::Json(_))));
  }

  #[test]
  fn reads_ttl() {
    let cfg = Config::from_json(r#"{"ttlMs": 60000, "port": 5684}"#).unwrap();
    assert_eq!(cfg.ttl, Milliseconds(60_000u64));
    assert_eq!(cfg.port, 5684);
  }
}
