//! Node configuration shared by the host tests and the ESP32 binaries.
//!
//! Uses `heapless::String` for the text fields so the structs have a fixed
//! size and can be built before any allocator-heavy service starts.
//!
//! Tuning values (thresholds, step counts) have defaults and `with_*`
//! builders. Credentials and peer addresses have no sensible default, so the
//! binaries load them through [`NetworkConfig::from_lookup`], which fails on
//! the first missing field.
//!
//! # Example
//!
//! ```rust
//! use room_nodes::config::{DispatcherConfig, NetworkConfig, RequiredField};
//!
//! let lookup = |field: RequiredField| match field {
//!     RequiredField::WifiSsid => Some("home"),
//!     RequiredField::WifiPassword => Some("hunter2"),
//!     RequiredField::IngestUrl => Some("https://example.invalid/ingestEvent"),
//!     RequiredField::IngestApiKey => Some("key"),
//!     RequiredField::BlindsPeer => Some("14:33:5C:02:AD:70"),
//!     RequiredField::LightPeer => Some("6C:C8:40:89:73:E8"),
//! };
//! let network = NetworkConfig::from_lookup(lookup).unwrap();
//! assert_eq!(network.wifi.ssid.as_str(), "home");
//!
//! let dispatch = DispatcherConfig::default().with_steps_per_tap(600);
//! assert_eq!(dispatch.steps_per_tap, 600);
//! ```

use core::fmt;

use heapless::String as HString;
use thiserror::Error;

use crate::traits::PeerAddress;

/// Maximum length for short config strings (SSIDs, keys, node ids)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (URLs)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helpers for creating heapless strings
// ============================================================================

/// Copies as much of `s` as fits in `N` bytes, cutting on a char boundary.
pub fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut hs = HString::new();
    // Cannot fail: end <= N
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// WiFi Config
// ============================================================================

/// Access point used for the temporary reporting association.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// How long one association may take, in milliseconds
    pub connect_timeout_ms: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_ms: 15_000,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the association timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Ingest Config
// ============================================================================

/// Event ingestion endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Full HTTPS URL of the ingestion function
    pub url: LongString,
    /// Value of the `x-api-key` header
    pub api_key: ShortString,
    /// Reported as `source` in every event
    pub source_id: ShortString,
    /// HTTP request timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: LongString::new(),
            api_key: ShortString::new(),
            source_id: short_string("main-node"),
            timeout_ms: 4_000,
        }
    }
}

impl IngestConfig {
    /// Set the endpoint URL
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = long_string(url);
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = short_string(key);
        self
    }

    /// Set the reporting node's id
    pub fn with_source_id(mut self, id: &str) -> Self {
        self.source_id = short_string(id);
        self
    }

    /// Set the request timeout
    pub fn with_timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }
}

// ============================================================================
// Peers and Dispatch Tuning
// ============================================================================

/// Radio addresses of the actuator nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeersConfig {
    /// Blinds stepper node
    pub blinds: PeerAddress,
    /// Desk LED node
    pub light: PeerAddress,
}

impl PeersConfig {
    /// Set the blinds node address
    pub fn with_blinds(mut self, peer: PeerAddress) -> Self {
        self.blinds = peer;
        self
    }

    /// Set the LED node address
    pub fn with_light(mut self, peer: PeerAddress) -> Self {
        self.light = peer;
        self
    }
}

/// Main-node decision tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Steps per blinds button tap
    pub steps_per_tap: i32,
    /// Step period sent with blinds commands, in microseconds
    pub period_us: u16,
    /// Night mode turns the light on below this reading
    pub light_on_threshold: u16,
    /// Night mode turns the light off above this reading
    pub light_off_threshold: u16,
    /// Assumed blinds state at boot
    pub blinds_initially_open: bool,
    /// Assumed light state at boot
    pub light_initially_on: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            steps_per_tap: 1200,
            period_us: 800,
            light_on_threshold: 1000,
            light_off_threshold: 1500,
            blinds_initially_open: false,
            light_initially_on: true,
        }
    }
}

impl DispatcherConfig {
    /// Set the steps per tap
    pub fn with_steps_per_tap(mut self, steps: i32) -> Self {
        self.steps_per_tap = steps;
        self
    }

    /// Set the step period
    pub fn with_period_us(mut self, period_us: u16) -> Self {
        self.period_us = period_us;
        self
    }

    /// Set the hysteresis band (on below `on`, off above `off`)
    pub fn with_thresholds(mut self, on: u16, off: u16) -> Self {
        self.light_on_threshold = on;
        self.light_off_threshold = off;
        self
    }

    /// Set the assumed state at boot
    pub fn with_initial_state(mut self, blinds_open: bool, light_on: bool) -> Self {
        self.blinds_initially_open = blinds_open;
        self.light_initially_on = light_on;
        self
    }
}

// ============================================================================
// Loaded Network Config
// ============================================================================

/// Fields with no default that must be supplied at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequiredField {
    /// Access point SSID
    WifiSsid,
    /// Access point password
    WifiPassword,
    /// Ingestion endpoint URL
    IngestUrl,
    /// Ingestion API key
    IngestApiKey,
    /// Blinds node radio address
    BlindsPeer,
    /// LED node radio address
    LightPeer,
}

impl RequiredField {
    /// Every required field, in load order.
    pub const ALL: [RequiredField; 6] = [
        RequiredField::WifiSsid,
        RequiredField::WifiPassword,
        RequiredField::IngestUrl,
        RequiredField::IngestApiKey,
        RequiredField::BlindsPeer,
        RequiredField::LightPeer,
    ];

    /// Environment variable name the binaries read the field from.
    pub const fn env_key(self) -> &'static str {
        match self {
            RequiredField::WifiSsid => "WIFI_SSID",
            RequiredField::WifiPassword => "WIFI_PASS",
            RequiredField::IngestUrl => "INGEST_URL",
            RequiredField::IngestApiKey => "INGEST_API_KEY",
            RequiredField::BlindsPeer => "BLINDS_PEER",
            RequiredField::LightPeer => "LIGHT_PEER",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_key())
    }
}

/// Startup configuration failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required field was not supplied or is empty.
    #[error("missing required configuration {0}")]
    Missing(RequiredField),
    /// A peer address did not parse.
    #[error("invalid peer address in {field}: {value:?}")]
    InvalidPeer {
        /// Field holding the address.
        field: RequiredField,
        /// Offending value (truncated).
        value: ShortString,
    },
}

/// Everything the main node needs to talk to its peers and the ingestion
/// service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Reporting association
    pub wifi: WifiConfig,
    /// Ingestion endpoint
    pub ingest: IngestConfig,
    /// Actuator node addresses
    pub peers: PeersConfig,
}

impl NetworkConfig {
    /// Loads every [`RequiredField`] through `lookup`.
    ///
    /// Values are trimmed. An absent or blank value fails with
    /// [`ConfigError::Missing`] naming the first such field.
    pub fn from_lookup<'a, F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(RequiredField) -> Option<&'a str>,
    {
        let mut require = |field: RequiredField| {
            lookup(field)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(field))
        };
        let peer = |field: RequiredField, value: &str| {
            value.parse::<PeerAddress>().map_err(|_| ConfigError::InvalidPeer {
                field,
                value: short_string(value),
            })
        };

        let wifi = WifiConfig::default()
            .with_ssid(require(RequiredField::WifiSsid)?)
            .with_password(require(RequiredField::WifiPassword)?);
        let ingest = IngestConfig::default()
            .with_url(require(RequiredField::IngestUrl)?)
            .with_api_key(require(RequiredField::IngestApiKey)?);
        let blinds = peer(RequiredField::BlindsPeer, require(RequiredField::BlindsPeer)?)?;
        let light = peer(RequiredField::LightPeer, require(RequiredField::LightPeer)?)?;

        Ok(Self {
            wifi,
            ingest,
            peers: PeersConfig { blinds, light },
        })
    }

    /// Set the reporting node's id
    pub fn with_source_id(mut self, id: &str) -> Self {
        self.ingest = self.ingest.with_source_id(id);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
