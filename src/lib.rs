//! # seqmidi - MIDI access through the host sequencer
//!
//! Umbrella crate over **seqmidi-io**: port discovery, connections to device
//! ports, virtual ports with MIDI 1.0 / UMP negotiation, and raw byte streams.
//!
//! ## Quick Start
//!
//! ```ignore
//! use seqmidi::prelude::*;
//!
//! let access = SeqMidiAccess::builder(AlsaBackend)
//!     .client_name("my-app")
//!     .build()?;
//!
//! let keyboard = access.list_inputs().into_iter().next().ok_or("no input")?;
//! let input = access.open_input(keyboard.id())?;
//! input.on_receive(|frame, _| println!("{:02X?}", frame));
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - In-process backend only
//! - `alsa-seq` - Host ALSA sequencer backend (Linux). The `alsa` bindings
//!   cannot set a client's MIDI version or a port's UMP group, so on this
//!   backend both are logged and kept in the handle only. Other sequencer
//!   clients do not see them.

/// Re-export of seqmidi-io for direct access
pub use seqmidi_io as io;

pub use seqmidi_io::{
    AccessConfig, ConnectionState, InputCallback, MemoryBackend, MidiAccess, MidiInput,
    MidiInputStream, MidiOutput, MidiOutputStream, MidiPort, PortAddress, PortCapabilities,
    PortCreatorContext, PortDescriptor, PortType, ProtocolVersion, SeqMidiAccess,
    SeqMidiAccessBuilder, Sequencer, SequencerBackend,
};

#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
pub use seqmidi_io::{AlsaBackend, AlsaMidiAccess};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        MidiAccess, MidiInput, MidiOutput, MidiPort, PortCreatorContext, PortDescriptor,
        ProtocolVersion, SeqMidiAccess,
    };

    #[cfg(all(feature = "alsa-seq", target_os = "linux"))]
    pub use crate::AlsaBackend;

    pub use crate::MemoryBackend;
}
