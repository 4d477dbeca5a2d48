//! Single-slot command hand-off from the radio receive callback to a node's
//! main loop.
//!
//! The receive callback runs on the radio driver's task. It decodes the frame
//! and stores it with [`Mailbox::deliver`]. The main loop calls
//! [`Mailbox::take`], which copies the command out and clears the slot in one
//! locked step. A command that arrives before the previous one was taken
//! replaces it; only the newest unprocessed command is ever executed.
//!
//! ```rust
//! use room_nodes::mailbox::Mailbox;
//! use room_nodes::wire::{LightCommand, WireMessage};
//!
//! let mailbox = Mailbox::<LightCommand>::new();
//! mailbox.deliver(&LightCommand::turn_off().encode()).unwrap();
//! mailbox.deliver(&LightCommand::toggle().encode()).unwrap();
//!
//! assert_eq!(mailbox.take(), Some(LightCommand::toggle()));
//! assert_eq!(mailbox.take(), None);
//! assert_eq!(mailbox.overwritten(), 1);
//! ```

use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::wire::{DecodeError, WireMessage};

#[derive(Debug)]
struct Slot<T> {
    latest: Option<T>,
    overwritten: u32,
}

/// Latest-wins command slot shared between a callback and the main loop.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
}

impl<T: WireMessage> Mailbox<T> {
    /// Creates an empty mailbox.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                latest: None,
                overwritten: 0,
            }),
        }
    }

    // A panic while holding the lock cannot leave the slot inconsistent.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decodes a received frame into the slot.
    ///
    /// Undersized frames are dropped and leave the slot untouched.
    pub fn deliver(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        match T::decode(bytes) {
            Ok(cmd) => {
                self.post(cmd);
                Ok(())
            }
            Err(e) => {
                debug!("mailbox: dropped frame: {}", e);
                Err(e)
            }
        }
    }

    /// Stores an already decoded command, replacing any unprocessed one.
    pub fn post(&self, cmd: T) {
        let mut slot = self.lock();
        if slot.latest.replace(cmd).is_some() {
            slot.overwritten = slot.overwritten.saturating_add(1);
        }
    }

    /// Removes and returns the pending command, if any.
    pub fn take(&self) -> Option<T> {
        self.lock().latest.take()
    }

    /// Whether a command is waiting.
    pub fn has_pending(&self) -> bool {
        self.lock().latest.is_some()
    }

    /// Number of commands replaced before they were taken.
    pub fn overwritten(&self) -> u32 {
        self.lock().overwritten
    }
}

impl<T: WireMessage> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
