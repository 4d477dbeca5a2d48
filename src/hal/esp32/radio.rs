//! ESP-NOW command link.
//!
//! Frames are unencrypted and unacknowledged. Peers are registered on the
//! current channel (channel 0 means "whatever the interface is on").
//!
//! The send-result callback only logs. The receive callback decodes straight
//! into a [`Mailbox`]; undersized frames are dropped there.

use std::sync::Arc;

use esp_idf_svc::espnow::{EspNow, PeerInfo, SendStatus};
use esp_idf_svc::sys::EspError;
use log::{debug, info, warn};

use crate::mailbox::Mailbox;
use crate::traits::{PeerAddress, RadioLink};
use crate::wire::WireMessage;

/// [`RadioLink`] over ESP-NOW.
///
/// Wi-Fi must be started (station mode) before [`EspNow::take`].
///
/// ```ignore
/// let link = EspNowLink::new(EspNow::take()?);
/// link.log_send_results()?;
/// if let Err(e) = link.add_peer(peers.blinds) {
///     log::warn!("add_peer (blinds) failed: {e}");
/// }
/// ```
pub struct EspNowLink<'a> {
    espnow: EspNow<'a>,
}

impl<'a> EspNowLink<'a> {
    /// Wraps an initialized ESP-NOW driver.
    pub fn new(espnow: EspNow<'a>) -> Self {
        Self { espnow }
    }

    /// Registers an unencrypted peer on the current channel.
    pub fn add_peer(&self, peer: PeerAddress) -> Result<(), EspError> {
        self.espnow.add_peer(PeerInfo {
            peer_addr: peer.octets(),
            channel: 0,
            encrypt: false,
            ..Default::default()
        })?;
        info!("espnow: peer {} added", peer);
        Ok(())
    }

    /// Logs the delivery status of every frame sent.
    pub fn log_send_results(&self) -> Result<(), EspError> {
        self.espnow.register_send_cb(|mac: &[u8], status: SendStatus| {
            let ok = matches!(status, SendStatus::SUCCESS);
            debug!(
                "espnow: send -> {:02X?} : {}",
                mac,
                if ok { "OK" } else { "FAIL" }
            );
        })
    }

    /// Decodes every received frame into `mailbox`.
    pub fn deliver_to<T>(&self, mailbox: Arc<Mailbox<T>>) -> Result<(), EspError>
    where
        T: WireMessage + Send + 'static,
    {
        self.espnow.register_recv_cb(move |_, data: &[u8]| {
            // Drops are logged by the mailbox
            let _ = mailbox.deliver(data);
        })
    }
}

impl RadioLink for EspNowLink<'_> {
    type Error = EspError;

    fn send(&mut self, peer: PeerAddress, payload: &[u8]) -> Result<(), EspError> {
        self.espnow.send(peer.octets(), payload).inspect_err(|e| {
            warn!("espnow: queueing {} bytes to {} failed: {}", payload.len(), peer, e);
        })
    }
}
