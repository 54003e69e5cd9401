//! Sequencer capability boundary.
//!
//! The access layer never talks to a driver directly. It opens handles through
//! a [`SequencerBackend`] and calls the narrow [`Sequencer`] surface:
//! cursor-style enumeration, port creation, subscriptions, raw frame I/O and a
//! listening loop.
//!
//! - [`MemoryBackend`]: in-process sequencer, always available.
//! - `AlsaBackend`: the host ALSA sequencer (feature `alsa-seq`, Linux only).

mod listener;
mod memory;

#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
mod alsa;

pub use listener::{FrameHandler, Listener, ListenerStatus, StopSignal};
pub use memory::{MemoryBackend, MemorySequencer};

#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
pub use self::alsa::{AlsaBackend, AlsaSequencer};

use crate::error::Result;
use crate::port::{PortAddress, PortCapabilities, PortType, ProtocolVersion};

/// Direction a sequencer handle is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoType {
    Duplex,
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    NonBlocking,
    Blocking,
}

/// Which side of a port's subscriptions to query or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionDirection {
    /// Subscribers reading from the port (the port is the sender).
    Read,
    /// Subscribers writing to the port (the port is the destination).
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub client: i32,
    pub name: String,
    pub midi_version: ProtocolVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub address: PortAddress,
    pub name: String,
    pub capabilities: PortCapabilities,
    pub port_type: PortType,
    pub ump_group: Option<u8>,
}

/// One open connection to the host sequencer.
///
/// Handles are shared between the caller and a stream's receive thread, so
/// every method takes `&self`.
pub trait Sequencer: Send + Sync + 'static {
    /// Client id the sequencer assigned to this handle.
    fn client_id(&self) -> i32;

    /// First client with an id greater than `after` (`None` = before-first).
    fn next_client(&self, after: Option<i32>) -> Option<ClientInfo>;

    /// First port of `client` with an id greater than `after`.
    fn next_port(&self, client: i32, after: Option<i32>) -> Option<PortInfo>;

    /// Returns the new port id, or a negative driver error code.
    fn create_port(&self, name: &str, capabilities: PortCapabilities, port_type: PortType) -> i32;

    fn delete_port(&self, port: i32) -> Result<()>;

    fn subscribe(&self, sender: PortAddress, destination: PortAddress) -> Result<()>;

    /// The `index`-th subscriber on the given side of `address`, if any.
    fn query_subscribers(
        &self,
        address: PortAddress,
        direction: SubscriptionDirection,
        index: usize,
    ) -> Option<PortAddress>;

    /// Removes the subscription between `local_port` and `remote`.
    ///
    /// `Read`: local → remote. `Write`: remote → local.
    fn disconnect(
        &self,
        local_port: i32,
        remote: PortAddress,
        direction: SubscriptionDirection,
    ) -> Result<()>;

    /// Delivers one raw frame from `port` to all of its subscribers.
    fn send(&self, port: i32, data: &[u8]) -> Result<()>;

    /// Starts a receive loop on `port`. Frames are at most `buffer_size` bytes.
    fn start_listening(
        &self,
        port: i32,
        buffer_size: usize,
        handler: FrameHandler,
    ) -> Result<Listener>;

    fn port_info(&self, port: i32) -> Result<PortInfo>;

    fn set_port_info(&self, port: i32, info: &PortInfo) -> Result<()>;

    fn set_client_name(&self, name: &str) -> Result<()>;

    fn client_info(&self) -> Result<ClientInfo>;

    fn set_client_info(&self, info: &ClientInfo) -> Result<()>;
}

/// Opens sequencer handles.
pub trait SequencerBackend: Send + Sync + 'static {
    type Handle: Sequencer;

    /// Display name of the access layer built on this backend.
    fn name(&self) -> &'static str;

    fn open(&self, io: IoType, mode: IoMode) -> Result<Self::Handle>;
}

