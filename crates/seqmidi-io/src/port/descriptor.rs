use super::{PortAddress, PortCapabilities, PortType, ProtocolVersion};
use crate::sequencer::{ClientInfo, PortInfo};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one sequencer port.
///
/// Discovery builds fresh descriptors on every query; streams keep the
/// descriptors of their target and local ports for their whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    address: PortAddress,
    id: String,
    name: String,
    manufacturer: String,
    version: String,
    capabilities: PortCapabilities,
    port_type: PortType,
    ump_group: Option<u8>,
}

impl PortDescriptor {
    /// `client` must be the owner of `info`: it provides the manufacturer
    /// and version strings.
    pub fn from_info(info: PortInfo, client: &ClientInfo) -> Self {
        debug_assert_eq!(info.address.client, client.client);
        Self {
            id: info.address.id(),
            address: info.address,
            name: info.name,
            manufacturer: client.name.clone(),
            version: client.midi_version.version_label().to_string(),
            capabilities: info.capabilities,
            port_type: info.port_type,
            ump_group: info.ump_group,
        }
    }

    pub fn address(&self) -> PortAddress {
        self.address
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn capabilities(&self) -> PortCapabilities {
        self.capabilities
    }

    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn ump_group(&self) -> Option<u8> {
        self.ump_group
    }

    pub fn protocol(&self) -> ProtocolVersion {
        ProtocolVersion::of_port_type(self.port_type)
    }

    /// Other clients can subscribe to read from this port.
    pub fn is_source(&self) -> bool {
        self.port_type.is_midi() && self.capabilities.contains(PortCapabilities::INPUT_REQUIRED)
    }

    /// Other clients can subscribe to write to this port.
    pub fn is_sink(&self) -> bool {
        self.port_type.is_midi() && self.capabilities.contains(PortCapabilities::OUTPUT_REQUIRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard() -> PortDescriptor {
        let client = ClientInfo {
            client: 20,
            name: "USB Keyboard".to_string(),
            midi_version: ProtocolVersion::Midi1,
        };
        let info = PortInfo {
            address: PortAddress::new(20, 0),
            name: "USB Keyboard MIDI 1".to_string(),
            capabilities: PortCapabilities::INPUT_REQUIRED | PortCapabilities::OUTPUT_REQUIRED,
            port_type: PortType::MIDI_GENERIC | PortType::HARDWARE,
            ump_group: None,
        };
        PortDescriptor::from_info(info, &client)
    }

    #[test]
    fn test_descriptor_fields() {
        let port = keyboard();
        assert_eq!(port.id(), "20_0");
        assert_eq!(port.name(), "USB Keyboard MIDI 1");
        assert_eq!(port.manufacturer(), "USB Keyboard");
        assert_eq!(port.version(), "1.0");
        assert_eq!(port.protocol(), ProtocolVersion::Midi1);
        assert!(port.is_source());
        assert!(port.is_sink());
    }

    #[test]
    fn test_descriptor_serde() {
        let port = keyboard();
        let json = serde_json::to_string(&port).unwrap();
        let back: PortDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, port);
    }
}
