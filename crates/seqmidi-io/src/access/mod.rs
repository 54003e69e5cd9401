//! Caller-facing access to sequencer MIDI ports.
//!
//! ## Quick Start
//!
//! ```ignore
//! use seqmidi_io::{AlsaBackend, MidiOutput, PortCreatorContext, SeqMidiAccess};
//!
//! let access = SeqMidiAccess::builder(AlsaBackend)
//!     .client_name("my-app")
//!     .build()?;
//!
//! // Discover and connect
//! for port in access.list_outputs() {
//!     println!("{} {} ({})", port.id(), port.name(), port.manufacturer());
//! }
//! let synth = access.open_output("20_0")?;
//! synth.send(&[0x90, 60, 100], 0)?;
//!
//! // Publish a port for other applications
//! let input = access.create_virtual_receiver(&PortCreatorContext::new("my-app", "in"))?;
//! input.on_receive(|frame, _| println!("{:02X?}", frame));
//! ```

mod builder;

pub use builder::SeqMidiAccessBuilder;

use crate::config::{AccessConfig, PortCreatorContext};
use crate::connect;
use crate::directory;
use crate::error::{Error, Result};
use crate::io::{MidiInput, MidiInputStream, MidiOutput, MidiOutputStream, Teardown};
use crate::port::PortDescriptor;
use crate::sequencer::{IoMode, IoType, Sequencer, SequencerBackend, SubscriptionDirection};
use crate::virtual_port;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Port access surface shared by MIDI backends.
pub trait MidiAccess: Send + Sync {
    fn name(&self) -> &str;

    fn inputs(&self) -> Vec<PortDescriptor>;

    fn outputs(&self) -> Vec<PortDescriptor>;

    fn open_input(&self, port_id: &str) -> Result<Box<dyn MidiInput>>;

    fn open_output(&self, port_id: &str) -> Result<Box<dyn MidiOutput>>;

    fn create_virtual_sender(&self, ctx: &PortCreatorContext) -> Result<Box<dyn MidiOutput>>;

    fn create_virtual_receiver(&self, ctx: &PortCreatorContext) -> Result<Box<dyn MidiInput>>;
}

/// MIDI port access through a host sequencer.
///
/// Discovery runs on a watcher handle and virtual ports share a second
/// handle; both are opened on first use and live as long as this value.
/// Every connected stream opens a handle of its own.
pub struct SeqMidiAccess<B: SequencerBackend> {
    backend: B,
    config: AccessConfig,
    watcher: OnceCell<B::Handle>,
    virtual_seq: OnceCell<Arc<dyn Sequencer>>,
}

impl<B: SequencerBackend> SeqMidiAccess<B> {
    /// Access with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::from_parts(backend, AccessConfig::default())
    }

    pub fn builder(backend: B) -> SeqMidiAccessBuilder<B> {
        SeqMidiAccessBuilder::new(backend)
    }

    pub(crate) fn from_parts(backend: B, config: AccessConfig) -> Self {
        Self {
            backend,
            config,
            watcher: OnceCell::new(),
            virtual_seq: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    // ==================== Discovery ====================

    /// Readable MIDI ports, in sequencer enumeration order.
    ///
    /// Empty when the sequencer cannot be opened.
    pub fn list_inputs(&self) -> Vec<PortDescriptor> {
        self.watcher()
            .map(|seq| directory::list_inputs(seq))
            .unwrap_or_default()
    }

    /// Writable MIDI ports, in sequencer enumeration order.
    pub fn list_outputs(&self) -> Vec<PortDescriptor> {
        self.watcher()
            .map(|seq| directory::list_outputs(seq))
            .unwrap_or_default()
    }

    pub fn find_input(&self, port_id: &str) -> Option<PortDescriptor> {
        directory::find_input(self.watcher()?, port_id)
    }

    pub fn find_output(&self, port_id: &str) -> Option<PortDescriptor> {
        directory::find_output(self.watcher()?, port_id)
    }

    // ==================== Connections ====================

    /// Connects a new local port to the input port `port_id`.
    pub fn open_input(&self, port_id: &str) -> Result<MidiInputStream> {
        let target = self
            .find_input(port_id)
            .ok_or_else(|| Error::PortNotFound(port_id.to_string()))?;
        let seq: Arc<dyn Sequencer> =
            Arc::new(self.open_handle(IoType::Input, IoMode::NonBlocking)?);
        let local = connect::connect_for_input(seq.as_ref(), &target, &self.config.input_port_name)?;
        MidiInputStream::start(
            seq,
            target,
            local,
            Teardown::Unsubscribe(SubscriptionDirection::Write),
            self.config.receive_buffer_size,
        )
    }

    /// Connects a new local port to the output port `port_id`.
    pub fn open_output(&self, port_id: &str) -> Result<MidiOutputStream> {
        let target = self
            .find_output(port_id)
            .ok_or_else(|| Error::PortNotFound(port_id.to_string()))?;
        let seq: Arc<dyn Sequencer> = Arc::new(self.open_handle(IoType::Output, IoMode::Blocking)?);
        let local =
            connect::connect_for_output(seq.as_ref(), &target, &self.config.output_port_name)?;
        Ok(MidiOutputStream::new(
            seq,
            target,
            local,
            Teardown::Unsubscribe(SubscriptionDirection::Read),
        ))
    }

    // ==================== Virtual ports ====================

    pub fn create_virtual_sender(&self, ctx: &PortCreatorContext) -> Result<MidiOutputStream> {
        virtual_port::create_virtual_sender(self.virtual_handle()?, ctx)
    }

    pub fn create_virtual_receiver(&self, ctx: &PortCreatorContext) -> Result<MidiInputStream> {
        virtual_port::create_virtual_receiver(
            self.virtual_handle()?,
            ctx,
            self.config.receive_buffer_size,
        )
    }

    // ==================== Handles ====================

    fn open_handle(&self, io: IoType, mode: IoMode) -> Result<B::Handle> {
        let seq = self.backend.open(io, mode)?;
        seq.set_client_name(&self.config.client_name)?;
        Ok(seq)
    }

    fn watcher(&self) -> Option<&B::Handle> {
        let opened = self
            .watcher
            .get_or_try_init(|| self.open_handle(IoType::Duplex, IoMode::NonBlocking));
        match opened {
            Ok(seq) => Some(seq),
            Err(e) => {
                tracing::warn!("{} sequencer unavailable for discovery: {}", self.name(), e);
                None
            }
        }
    }

    fn virtual_handle(&self) -> Result<Arc<dyn Sequencer>> {
        let seq = self.virtual_seq.get_or_try_init(|| {
            let seq = self.open_handle(IoType::Duplex, IoMode::NonBlocking)?;
            Ok::<_, Error>(Arc::new(seq) as Arc<dyn Sequencer>)
        })?;
        Ok(Arc::clone(seq))
    }
}

impl<B: SequencerBackend> MidiAccess for SeqMidiAccess<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn inputs(&self) -> Vec<PortDescriptor> {
        self.list_inputs()
    }

    fn outputs(&self) -> Vec<PortDescriptor> {
        self.list_outputs()
    }

    fn open_input(&self, port_id: &str) -> Result<Box<dyn MidiInput>> {
        Ok(Box::new(SeqMidiAccess::open_input(self, port_id)?))
    }

    fn open_output(&self, port_id: &str) -> Result<Box<dyn MidiOutput>> {
        Ok(Box::new(SeqMidiAccess::open_output(self, port_id)?))
    }

    fn create_virtual_sender(&self, ctx: &PortCreatorContext) -> Result<Box<dyn MidiOutput>> {
        Ok(Box::new(SeqMidiAccess::create_virtual_sender(self, ctx)?))
    }

    fn create_virtual_receiver(&self, ctx: &PortCreatorContext) -> Result<Box<dyn MidiInput>> {
        Ok(Box::new(SeqMidiAccess::create_virtual_receiver(self, ctx)?))
    }
}
