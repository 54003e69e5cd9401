//! Sequencer port addressing, capability and type bitsets, protocol version.
//!
//! Bit values match the ALSA sequencer ABI so backends can pass them through.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// (client, port) pair. Unique within the sequencer for the lifetime of the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortAddress {
    pub client: i32,
    pub port: i32,
}

impl PortAddress {
    pub const fn new(client: i32, port: i32) -> Self {
        Self { client, port }
    }

    /// Stable string id used by the access layer (`"{client}_{port}"`).
    pub fn id(&self) -> String {
        format!("{}_{}", self.client, self.port)
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client, self.port)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PortCapabilities: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const SYNC_READ = 1 << 2;
        const SYNC_WRITE = 1 << 3;
        const DUPLEX = 1 << 4;
        const SUBS_READ = 1 << 5;
        const SUBS_WRITE = 1 << 6;
        const NO_EXPORT = 1 << 7;
        const INACTIVE = 1 << 8;
        const UMP_ENDPOINT = 1 << 9;
    }
}

impl PortCapabilities {
    /// A discovered input (source) must be readable and subscribable for read.
    pub const INPUT_REQUIRED: Self = Self::READ.union(Self::SUBS_READ);
    /// A discovered output (sink) must be writable and subscribable for write.
    pub const OUTPUT_REQUIRED: Self = Self::WRITE.union(Self::SUBS_WRITE);
    /// Local port receiving from a device; hidden from other clients.
    pub const INPUT_CONNECTED: Self = Self::WRITE.union(Self::SUBS_WRITE).union(Self::NO_EXPORT);
    /// Local port sending to a device; hidden from other clients.
    pub const OUTPUT_CONNECTED: Self = Self::READ.union(Self::SUBS_READ).union(Self::NO_EXPORT);
    /// Virtual port other applications read from.
    pub const VIRTUAL_SENDER: Self = Self::READ.union(Self::SUBS_READ);
    /// Virtual port other applications write to.
    pub const VIRTUAL_RECEIVER: Self = Self::WRITE.union(Self::SUBS_WRITE);
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PortType: u32 {
        const SPECIFIC = 1 << 0;
        const MIDI_GENERIC = 1 << 1;
        const MIDI_GM = 1 << 2;
        const MIDI_GS = 1 << 3;
        const MIDI_XG = 1 << 4;
        const MIDI_MT32 = 1 << 5;
        const MIDI_GM2 = 1 << 6;
        const MIDI_UMP = 1 << 7;
        const SYNTH = 1 << 10;
        const DIRECT_SAMPLE = 1 << 11;
        const SAMPLE = 1 << 12;
        const HARDWARE = 1 << 16;
        const SOFTWARE = 1 << 17;
        const SYNTHESIZER = 1 << 18;
        const PORT = 1 << 19;
        const APPLICATION = 1 << 20;
    }
}

impl PortType {
    /// Ports are eligible for discovery only if their type intersects this mask.
    pub const MIDI_MASK: Self = Self::MIDI_GENERIC.union(Self::APPLICATION);

    pub fn is_midi(&self) -> bool {
        self.intersects(Self::MIDI_MASK)
    }
}

/// MIDI protocol negotiated for a port or client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[default]
    Unspecified,
    /// Classic byte-stream MIDI 1.0.
    Midi1,
    /// Universal MIDI Packet (MIDI 2.0).
    Midi2,
}

impl ProtocolVersion {
    pub fn as_i32(self) -> i32 {
        match self {
            ProtocolVersion::Unspecified => 0,
            ProtocolVersion::Midi1 => 1,
            ProtocolVersion::Midi2 => 2,
        }
    }

    /// Unknown values map to `Unspecified`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => ProtocolVersion::Midi1,
            2 => ProtocolVersion::Midi2,
            _ => ProtocolVersion::Unspecified,
        }
    }

    pub fn is_specified(self) -> bool {
        self != ProtocolVersion::Unspecified
    }

    /// Protocol a port speaks, derived from its type bits.
    pub fn of_port_type(port_type: PortType) -> Self {
        if port_type.contains(PortType::MIDI_UMP) {
            ProtocolVersion::Midi2
        } else {
            ProtocolVersion::Midi1
        }
    }

    pub(crate) fn version_label(self) -> &'static str {
        match self {
            ProtocolVersion::Unspecified => "",
            ProtocolVersion::Midi1 => "1.0",
            ProtocolVersion::Midi2 => "2.0",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_masks() {
        assert!(PortCapabilities::INPUT_REQUIRED.contains(PortCapabilities::READ));
        assert!(PortCapabilities::INPUT_REQUIRED.contains(PortCapabilities::SUBS_READ));
        assert!(!PortCapabilities::INPUT_REQUIRED.contains(PortCapabilities::WRITE));
        assert_eq!(PortCapabilities::OUTPUT_REQUIRED.bits(), 0b100_0010);
    }

    #[test]
    fn test_connected_ports_are_not_exported() {
        assert!(PortCapabilities::INPUT_CONNECTED.contains(PortCapabilities::NO_EXPORT));
        assert!(PortCapabilities::OUTPUT_CONNECTED.contains(PortCapabilities::NO_EXPORT));
        assert!(!PortCapabilities::VIRTUAL_SENDER.contains(PortCapabilities::NO_EXPORT));
        assert!(!PortCapabilities::VIRTUAL_RECEIVER.contains(PortCapabilities::NO_EXPORT));
    }

    #[test]
    fn test_midi_mask() {
        assert!(PortType::MIDI_GENERIC.is_midi());
        assert!((PortType::APPLICATION | PortType::MIDI_UMP).is_midi());
        assert!(!PortType::MIDI_UMP.is_midi());
        assert!(!PortType::SYNTH.is_midi());
    }

    #[test]
    fn test_protocol_from_port_type() {
        assert_eq!(
            ProtocolVersion::of_port_type(PortType::MIDI_GENERIC),
            ProtocolVersion::Midi1
        );
        assert_eq!(
            ProtocolVersion::of_port_type(PortType::MIDI_GENERIC | PortType::MIDI_UMP),
            ProtocolVersion::Midi2
        );
    }

    #[test]
    fn test_protocol_numeric_values() {
        assert_eq!(ProtocolVersion::from_i32(2), ProtocolVersion::Midi2);
        assert_eq!(ProtocolVersion::from_i32(7), ProtocolVersion::Unspecified);
        assert_eq!(ProtocolVersion::Midi1.as_i32(), 1);
    }

    #[test]
    fn test_address_id_and_display() {
        let addr = PortAddress::new(128, 3);
        assert_eq!(addr.id(), "128_3");
        assert_eq!(addr.to_string(), "128:3");
    }
}
