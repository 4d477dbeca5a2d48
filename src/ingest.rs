//! State-transition events and the HTTPS reporting session.
//!
//! The main node reports every toggle it issues to a cloud ingestion endpoint.
//! The endpoint takes a JSON body:
//!
//! ```json
//! {"device":"blinds","action":"TOGGLE","requested_state":"open",
//!  "tx_id":"blinds-81234-0","source":"main-node","client_ts":81234}
//! ```
//!
//! `tx_id` is the idempotency key on the server side, so it carries the
//! reporter's issue sequence number as well as its clock. Any 2xx status counts as
//! success. Failures are returned to the caller to be logged; nothing is
//! queued or retried.
//!
//! # Radio sharing
//!
//! The command link and the Wi-Fi association share one radio. A report joins
//! the access point (changing channel), posts, and then puts the radio back on
//! the command channel. [`HttpsEventSink`] restores the channel on every path
//! out of a report, including association and HTTP failures.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IngestConfig;
use crate::traits::{EventSink, Uplink};

/// Action name reported for toggles.
pub const ACTION_TOGGLE: &str = "TOGGLE";

// ============================================================================
// Devices and Events
// ============================================================================

/// Remote actuators tracked by the main node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Device {
    /// Window blinds stepper node.
    Blinds,
    /// Desk LED node.
    DeskLight,
}

impl Device {
    /// Identifier used by the ingestion service.
    pub const fn id(self) -> &'static str {
        match self {
            Device::Blinds => "blinds",
            Device::DeskLight => "desk_led",
        }
    }

    /// Prefix of locally generated transaction ids.
    pub const fn tx_prefix(self) -> &'static str {
        match self {
            Device::Blinds => "blinds",
            Device::DeskLight => "led",
        }
    }

    /// Human-readable state for an assumed on/open flag.
    pub const fn state_label(self, on_or_open: bool) -> &'static str {
        match (self, on_or_open) {
            (Device::Blinds, true) => "open",
            (Device::Blinds, false) => "closed",
            (Device::DeskLight, true) => "on",
            (Device::DeskLight, false) => "off",
        }
    }
}

/// One state-transition record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEvent {
    /// Device identifier (`"blinds"`, `"desk_led"`).
    pub device: String,
    /// Logical action taken (`"TOGGLE"`).
    pub action: String,
    /// State the command asked for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_state: Option<String>,
    /// State confirmed by the actuator, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_state: Option<String>,
    /// Idempotency key.
    pub tx_id: String,
    /// Reporting node.
    pub source: String,
    /// Reporter's clock in milliseconds.
    pub client_ts: u64,
}

impl StateEvent {
    /// A toggle whose new (post-toggle) state is `new_state`.
    ///
    /// `seq` is the reporter's issue counter; it keeps `tx_id` unique when two
    /// toggles share a millisecond.
    pub fn toggle(device: Device, new_state: bool, source: &str, now_ms: u64, seq: u32) -> Self {
        Self {
            device: device.id().into(),
            action: ACTION_TOGGLE.into(),
            requested_state: Some(device.state_label(new_state).into()),
            confirmed_state: None,
            tx_id: format!("{}-{}-{}", device.tx_prefix(), now_ms, seq),
            source: source.into(),
            client_ts: now_ms,
        }
    }

    /// The most concrete state carried by the event.
    pub fn latest_state(&self) -> Option<&str> {
        self.confirmed_state
            .as_deref()
            .or(self.requested_state.as_deref())
    }
}

// ============================================================================
// HTTPS Sink
// ============================================================================

/// Failures of one report.
#[derive(Debug, Error)]
pub enum IngestError<E: core::fmt::Debug> {
    /// Joining the network failed.
    #[error("network association failed: {0:?}")]
    Associate(E),
    /// The HTTP exchange failed.
    #[error("http request failed: {0:?}")]
    Http(E),
    /// The endpoint answered with a non-2xx status.
    #[error("ingestion endpoint returned status {0}")]
    Status(u16),
    /// The event could not be serialized.
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Puts the radio back on the command channel when dropped.
struct RadioRestore<'a, U: Uplink>(&'a mut U);

impl<U: Uplink> Drop for RadioRestore<'_, U> {
    fn drop(&mut self) {
        self.0.restore_radio();
    }
}

/// [`EventSink`] posting events to the ingestion endpoint over an [`Uplink`].
///
/// # Example
///
/// ```rust
/// use room_nodes::config::IngestConfig;
/// use room_nodes::hal::MockUplink;
/// use room_nodes::ingest::{Device, HttpsEventSink, StateEvent};
/// use room_nodes::traits::EventSink;
///
/// let config = IngestConfig::default()
///     .with_url("https://example.invalid/ingestEvent")
///     .with_api_key("k");
/// let mut sink = HttpsEventSink::new(MockUplink::new(), config);
///
/// let event = StateEvent::toggle(Device::Blinds, true, "main-node", 1000, 0);
/// sink.report(&event).unwrap();
/// assert_eq!(sink.uplink().restores, 1);
/// ```
pub struct HttpsEventSink<U> {
    uplink: U,
    config: IngestConfig,
}

impl<U: Uplink> HttpsEventSink<U> {
    /// Creates a sink for the configured endpoint.
    pub fn new(uplink: U, config: IngestConfig) -> Self {
        Self { uplink, config }
    }

    /// The underlying uplink.
    pub fn uplink(&self) -> &U {
        &self.uplink
    }

    /// Mutable access to the underlying uplink.
    pub fn uplink_mut(&mut self) -> &mut U {
        &mut self.uplink
    }

    /// Endpoint configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }
}

impl<U: Uplink> EventSink for HttpsEventSink<U> {
    type Error = IngestError<U::Error>;

    fn report(&mut self, event: &StateEvent) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(event)?;

        let session = RadioRestore(&mut self.uplink);
        if let Err(e) = session.0.associate() {
            warn!("ingest: association failed: {:?}", e);
            return Err(IngestError::Associate(e));
        }

        let status = session
            .0
            .post_json(self.config.url.as_str(), self.config.api_key.as_str(), &body)
            .map_err(IngestError::Http)?;
        drop(session);

        debug!("ingest: {} -> HTTP {}", event.tx_id, status);
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(IngestError::Status(status))
        }
    }
}
