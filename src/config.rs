//! Tunables for discovery, the bridge session and lights.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Complete client configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use std::time::Duration;
/// use hue_lights_rs::Config;
///
/// let config = Config::from_json(r#"{"light": {"write_timeout": 500}}"#).unwrap();
/// assert_eq!(config.light.write_timeout, Duration::from_millis(500));
/// assert_eq!(config.session.http_port, 80);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub session: SessionConfig,
    pub light: LightConfig,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::JsonLoad)
    }
}

/// SSDP bridge discovery settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Where the M-SEARCH request is sent.
    pub search_target: SocketAddrV4,
    /// First local port tried; 0 lets the OS pick.
    pub bind_port: u16,
    /// Number of consecutive ports tried before giving up.
    pub max_bind_attempts: u32,
    /// How long a search cycle waits for replies before retrying.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
}

impl DiscoveryConfig {
    pub const SSDP_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
    pub const SSDP_PORT: u16 = 1900;
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_target: SocketAddrV4::new(Self::SSDP_ADDR, Self::SSDP_PORT),
            bind_port: 0,
            max_bind_attempts: 10,
            timeout: Duration::from_secs(1),
        }
    }
}

/// HTTP session settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Port of the bridge's REST API.
    pub http_port: u16,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("hue-lights-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Per-light settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// How long a state write may stay unanswered before it is force-completed.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub write_timeout: Duration,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_millis(250),
        }
    }
}
