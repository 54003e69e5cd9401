//! MIDI port access over a host sequencer.
//!
//! Discovers ports, connects application-owned ports to devices, publishes
//! virtual ports, and moves raw MIDI bytes in and out.
//!
//! Feature gates: `alsa-seq` (ALSA sequencer backend, Linux). The in-process
//! [`MemoryBackend`] is always available.
//!
//! On `alsa-seq`, a client MIDI version and a port UMP group requested
//! through [`PortCreatorContext`] are recorded locally and logged, not applied
//! on the host: the `alsa` bindings expose neither setter.

pub mod error;
pub use error::{Error, Result};

mod access;
pub use access::{MidiAccess, SeqMidiAccess, SeqMidiAccessBuilder};

mod config;
pub use config::{AccessConfig, PortCreatorContext};

pub mod connect;
pub mod directory;
pub mod virtual_port;

mod io;
pub use io::{
    ConnectionState, InputCallback, MidiInput, MidiInputStream, MidiOutput, MidiOutputStream,
    MidiPort,
};

mod port;
pub use port::{PortAddress, PortCapabilities, PortDescriptor, PortType, ProtocolVersion};

pub mod sequencer;
pub use sequencer::{MemoryBackend, Sequencer, SequencerBackend};

#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
pub use sequencer::AlsaBackend;

/// Sequencer access on the host ALSA sequencer.
#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
pub type AlsaMidiAccess = SeqMidiAccess<AlsaBackend>;
