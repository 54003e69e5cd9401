//! SeqMidiAccess builder.

use crate::config::AccessConfig;
use crate::error::Result;
use crate::sequencer::SequencerBackend;

use super::SeqMidiAccess;

pub struct SeqMidiAccessBuilder<B: SequencerBackend> {
    pub(super) backend: B,
    pub(super) config: AccessConfig,
}

impl<B: SequencerBackend> SeqMidiAccessBuilder<B> {
    pub(super) fn new(backend: B) -> Self {
        Self {
            backend,
            config: AccessConfig::default(),
        }
    }

    /// Replaces every setting at once, e.g. with a deserialized config.
    pub fn config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn input_port_name(mut self, name: impl Into<String>) -> Self {
        self.config.input_port_name = name.into();
        self
    }

    pub fn output_port_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_port_name = name.into();
        self
    }

    /// Frames larger than this are delivered in several callbacks.
    pub fn receive_buffer_size(mut self, bytes: usize) -> Self {
        self.config.receive_buffer_size = bytes;
        self
    }

    /// Validates the configuration. No sequencer handle is opened yet.
    pub fn build(self) -> Result<SeqMidiAccess<B>> {
        self.config.validate()?;
        Ok(SeqMidiAccess::from_parts(self.backend, self.config))
    }
}
