//! Network collaborator traits: the radio command link and the ingestion
//! uplink.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`RadioLink`] | Best-effort point-to-point send to a fixed peer |
//! | [`EventSink`] | Records a state transition with the ingestion service |
//! | [`Uplink`] | Temporary Wi-Fi association + HTTPS POST used by [`HttpsEventSink`] |
//!
//! Receiving is callback driven on the hardware and is not part of
//! [`RadioLink`]: the receive callback decodes straight into a
//! [`Mailbox`](crate::mailbox::Mailbox).
//!
//! [`HttpsEventSink`]: crate::ingest::HttpsEventSink

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

use crate::ingest::StateEvent;

// ============================================================================
// Peer Address
// ============================================================================

/// Six-byte hardware address of a radio peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    /// Returns the raw address bytes.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Failure to parse a `AA:BB:CC:DD:EE:FF` address.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid peer address: {0:?}")]
pub struct ParsePeerAddressError(pub heapless::String<32>);

impl FromStr for PeerAddress {
    type Err = ParsePeerAddressError;

    /// Parses colon- or dash-separated hex octets.
    ///
    /// ```
    /// use room_nodes::traits::PeerAddress;
    ///
    /// let addr: PeerAddress = "14:33:5c:02:ad:70".parse().unwrap();
    /// assert_eq!(addr.octets(), [0x14, 0x33, 0x5C, 0x02, 0xAD, 0x70]);
    /// assert_eq!(addr.to_string(), "14:33:5C:02:AD:70");
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParsePeerAddressError(crate::config::truncated(s.trim()));
        let mut out = [0u8; 6];
        let mut parts = s.trim().split([':', '-']);
        for octet in out.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            // from_str_radix alone would accept a sign
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(PeerAddress(out))
    }
}

// ============================================================================
// Radio Link
// ============================================================================

/// Point-to-point command transport.
///
/// `send` only reports whether the frame was queued. Delivery is not
/// guaranteed and there is no acknowledgement; on ESP32 the asynchronous
/// send-result callback is logged and nothing else.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use room_nodes::traits::{PeerAddress, RadioLink};
///
/// struct LoopbackLink { frames: Vec<(PeerAddress, Vec<u8>)> }
///
/// impl RadioLink for LoopbackLink {
///     type Error = ();
///
///     fn send(&mut self, peer: PeerAddress, payload: &[u8]) -> Result<(), ()> {
///         self.frames.push((peer, payload.to_vec()));
///         Ok(())
///     }
/// }
/// ```
pub trait RadioLink {
    /// Error type for queueing failures.
    type Error: fmt::Debug;

    /// Queues `payload` for transmission to `peer`.
    fn send(&mut self, peer: PeerAddress, payload: &[u8]) -> Result<(), Self::Error>;
}

impl<T: RadioLink + ?Sized> RadioLink for &mut T {
    type Error = T::Error;

    fn send(&mut self, peer: PeerAddress, payload: &[u8]) -> Result<(), Self::Error> {
        (**self).send(peer, payload)
    }
}

// ============================================================================
// Event Reporting
// ============================================================================

/// Destination for state-transition events.
///
/// Failures are reported to the caller, which logs them. Nothing is queued or
/// retried.
pub trait EventSink {
    /// Error type for reporting failures.
    type Error: fmt::Debug;

    /// Records one state transition.
    fn report(&mut self, event: &StateEvent) -> Result<(), Self::Error>;
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    type Error = T::Error;

    fn report(&mut self, event: &StateEvent) -> Result<(), Self::Error> {
        (**self).report(event)
    }
}

/// Temporary network association used for one HTTPS report.
///
/// The radio command link and the Wi-Fi association share one radio, so a
/// report switches the radio onto the access point's channel. Callers must
/// call [`restore_radio`](Self::restore_radio) after every
/// [`associate`](Self::associate) attempt, successful or not.
pub trait Uplink {
    /// Error type for association and HTTP failures.
    type Error: fmt::Debug;

    /// Joins the network used to reach the ingestion endpoint.
    fn associate(&mut self) -> Result<(), Self::Error>;

    /// POSTs a JSON body with the API key header and returns the HTTP status.
    fn post_json(&mut self, url: &str, api_key: &str, body: &[u8]) -> Result<u16, Self::Error>;

    /// Leaves the network and puts the radio back on the command channel.
    fn restore_radio(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_address_parse_and_display() {
        let addr: PeerAddress = "6C:C8:40:89:73:E8".parse().unwrap();
        assert_eq!(addr.0, [0x6C, 0xC8, 0x40, 0x89, 0x73, 0xE8]);
        assert_eq!(addr.to_string(), "6C:C8:40:89:73:E8");
    }

    #[test]
    fn peer_address_accepts_dashes_and_whitespace() {
        let addr: PeerAddress = "  14-33-5C-02-AD-70 ".parse().unwrap();
        assert_eq!(addr.octets(), [0x14, 0x33, 0x5C, 0x02, 0xAD, 0x70]);
    }

    #[test]
    fn peer_address_rejects_bad_input() {
        assert!("".parse::<PeerAddress>().is_err());
        assert!("14:33:5C:02:AD".parse::<PeerAddress>().is_err());
        assert!("14:33:5C:02:AD:70:11".parse::<PeerAddress>().is_err());
        assert!("14:33:5C:02:AD:7".parse::<PeerAddress>().is_err());
        assert!("14:33:5C:02:AD:ZZ".parse::<PeerAddress>().is_err());
    }

    #[test]
    fn peer_address_rejects_signed_octets() {
        assert!("14:33:5C:02:AD:+7".parse::<PeerAddress>().is_err());
        assert!("+1:33:5C:02:AD:70".parse::<PeerAddress>().is_err());
    }

    #[test]
    fn radio_link_through_mut_ref() {
        struct Count(usize);
        impl RadioLink for Count {
            type Error = ();
            fn send(&mut self, _peer: PeerAddress, _payload: &[u8]) -> Result<(), ()> {
                self.0 += 1;
                Ok(())
            }
        }

        let mut link = Count(0);
        {
            let mut by_ref = &mut link;
            by_ref.send(PeerAddress::default(), &[1]).unwrap();
        }
        assert_eq!(link.0, 1);
    }
}
