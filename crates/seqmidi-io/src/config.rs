//! Access-layer configuration and virtual port requests.

use crate::error::{Error, Result};
use crate::port::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Smallest receive buffer that still fits a UMP 128-bit packet burst.
const MIN_RECEIVE_BUFFER: usize = 16;
const MAX_RECEIVE_BUFFER: usize = 64 * 1024;

/// Settings for [`SeqMidiAccess`](crate::SeqMidiAccess).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Client name of the discovery and connection handles.
    pub client_name: String,
    /// Name of the local port created by `open_input`.
    pub input_port_name: String,
    /// Name of the local port created by `open_output`.
    pub output_port_name: String,
    /// Bytes per received frame.
    pub receive_buffer_size: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            client_name: "seqmidi".to_string(),
            input_port_name: "seqmidi input".to_string(),
            output_port_name: "seqmidi output".to_string(),
            receive_buffer_size: 512,
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            return Err(Error::InvalidConfig("client_name is empty".to_string()));
        }
        if self.input_port_name.is_empty() || self.output_port_name.is_empty() {
            return Err(Error::InvalidConfig("port names must not be empty".to_string()));
        }
        if !(MIN_RECEIVE_BUFFER..=MAX_RECEIVE_BUFFER).contains(&self.receive_buffer_size) {
            return Err(Error::InvalidConfig(format!(
                "receive_buffer_size {} out of range ({}-{} bytes)",
                self.receive_buffer_size, MIN_RECEIVE_BUFFER, MAX_RECEIVE_BUFFER
            )));
        }
        Ok(())
    }
}

/// Request for a virtual port.
///
/// `ump_group` is only applied when a protocol is requested. `manufacturer`
/// and `version` are carried for backends that publish them; the sequencer
/// backends ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortCreatorContext {
    pub application_name: String,
    pub port_name: String,
    pub protocol: ProtocolVersion,
    pub ump_group: u8,
    pub manufacturer: String,
    pub version: String,
}

impl PortCreatorContext {
    pub fn new(application_name: impl Into<String>, port_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            port_name: port_name.into(),
            ..Default::default()
        }
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_ump_group(mut self, group: u8) -> Self {
        self.ump_group = group;
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.port_name.is_empty() {
            return Err(Error::InvalidConfig("port_name is empty".to_string()));
        }
        // UMP has 16 groups
        if self.protocol.is_specified() && self.ump_group > 15 {
            return Err(Error::InvalidConfig(format!(
                "ump_group {} out of range (0-15)",
                self.ump_group
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AccessConfig::default();
        assert_eq!(config.receive_buffer_size, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_buffer_size_range() {
        let config = AccessConfig {
            receive_buffer_size: 4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AccessConfig = serde_json::from_str(r#"{"client_name":"looper"}"#).unwrap();
        assert_eq!(config.client_name, "looper");
        assert_eq!(config.input_port_name, "seqmidi input");
    }

    #[test]
    fn test_context_builder() {
        let ctx = PortCreatorContext::new("app", "out1")
            .with_protocol(ProtocolVersion::Midi2)
            .with_ump_group(3);
        assert_eq!(ctx.application_name, "app");
        assert_eq!(ctx.protocol, ProtocolVersion::Midi2);
        assert_eq!(ctx.ump_group, 3);
        assert!(ctx.validate().is_ok());
        assert!(ctx.with_ump_group(16).validate().is_err());
    }

    #[test]
    fn test_context_defaults_unspecified() {
        let ctx = PortCreatorContext::new("t", "out1");
        assert_eq!(ctx.protocol, ProtocolVersion::Unspecified);
        assert_eq!(ctx.ump_group, 0);
    }

    #[test]
    fn test_ump_group_ignored_without_protocol() {
        let ctx = PortCreatorContext::new("t", "out1").with_ump_group(200);
        assert!(ctx.validate().is_ok());
        assert!(ctx
            .with_protocol(ProtocolVersion::Midi1)
            .validate()
            .is_err());
    }
}
