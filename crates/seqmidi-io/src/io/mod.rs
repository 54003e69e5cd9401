//! Byte-stream I/O on opened ports.
//!
//! Both stream types come in two flavours: connected to a device port (the
//! local port is subscribed to/from the target) and virtual (a published port
//! with no subscription of its own). The flavour only changes teardown.

mod input;
mod output;

pub use input::{InputCallback, MidiInputStream};
pub use output::MidiOutputStream;

use crate::error::Result;
use crate::port::{PortDescriptor, ProtocolVersion};
use crate::sequencer::{Sequencer, SubscriptionDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Open,
    /// The receive loop died on a driver error; `close()` is still required.
    Failed,
    Closed,
}

/// Shared surface of input and output streams.
pub trait MidiPort: Send + Sync {
    /// The port this stream talks to: the device port for connected streams,
    /// the published port for virtual ones.
    fn details(&self) -> &PortDescriptor;

    /// The application-owned port created for this stream.
    fn local_port(&self) -> &PortDescriptor;

    fn connection_state(&self) -> ConnectionState;

    fn protocol(&self) -> ProtocolVersion;

    /// Always fails: the protocol is fixed when the port is created.
    fn set_protocol(&self, protocol: ProtocolVersion) -> Result<()>;

    /// Stops I/O and releases the local port. Later calls are no-ops.
    fn close(&self) -> Result<()>;
}

pub trait MidiInput: MidiPort {
    /// Replaces the current callback.
    fn set_callback(&self, callback: Box<InputCallback>);

    /// Frames keep being drained and are discarded.
    fn clear_callback(&self);
}

pub trait MidiOutput: MidiPort {
    /// Sends `data` after `timestamp_nanos` (0 = immediately), blocking the caller.
    fn send(&self, data: &[u8], timestamp_nanos: u64) -> Result<()>;
}

/// How a stream gives its local port back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    /// Drop subscriptions on the given side first (connected streams).
    Unsubscribe(SubscriptionDirection),
    /// Virtual ports own no subscription.
    DeleteOnly,
}

/// Disconnects subscribers as required by `teardown`, then deletes the port.
///
/// Finding no subscriber is fine (the peer may already be gone). A failed
/// disconnect is logged and the port is deleted anyway.
pub(crate) fn release_port(
    seq: &dyn Sequencer,
    local: &PortDescriptor,
    teardown: Teardown,
) -> Result<()> {
    let address = local.address();
    if let Teardown::Unsubscribe(direction) = teardown {
        let subscribers: Vec<_> = (0..)
            .map_while(|index| seq.query_subscribers(address, direction, index))
            .collect();
        if subscribers.is_empty() {
            tracing::debug!("No subscribers left on {}", address);
        }
        for remote in subscribers {
            match seq.disconnect(address.port, remote, direction) {
                Ok(()) => tracing::debug!("Disconnected {} from {}", address, remote),
                Err(e) => tracing::warn!("Failed to disconnect {} from {}: {}", address, remote, e),
            }
        }
    }
    seq.delete_port(address.port)?;
    tracing::debug!("Deleted MIDI port {} ({})", address, local.name());
    Ok(())
}
