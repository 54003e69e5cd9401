//! Virtual ports other applications connect to.
//!
//! Requesting a protocol turns the port into a UMP endpoint: the client's MIDI
//! version is negotiated before the port is created, and the UMP group is set
//! on the port right after.

use crate::config::PortCreatorContext;
use crate::connect::{delete_after_failure, describe_local};
use crate::error::{Error, Result};
use crate::io::{MidiInputStream, MidiOutputStream, Teardown};
use crate::port::{PortCapabilities, PortDescriptor, PortType};
use crate::sequencer::Sequencer;
use std::sync::Arc;

/// Publishes a port other applications read from.
pub fn create_virtual_sender(
    seq: Arc<dyn Sequencer>,
    ctx: &PortCreatorContext,
) -> Result<MidiOutputStream> {
    let local = create_port(seq.as_ref(), ctx, PortCapabilities::VIRTUAL_SENDER)?;
    Ok(MidiOutputStream::new(
        seq,
        local.clone(),
        local,
        Teardown::DeleteOnly,
    ))
}

/// Publishes a port other applications write to, with a receive loop on it.
pub fn create_virtual_receiver(
    seq: Arc<dyn Sequencer>,
    ctx: &PortCreatorContext,
    buffer_size: usize,
) -> Result<MidiInputStream> {
    let local = create_port(seq.as_ref(), ctx, PortCapabilities::VIRTUAL_RECEIVER)?;
    MidiInputStream::start(seq, local.clone(), local, Teardown::DeleteOnly, buffer_size)
}

fn create_port(
    seq: &dyn Sequencer,
    ctx: &PortCreatorContext,
    base: PortCapabilities,
) -> Result<PortDescriptor> {
    ctx.validate()?;
    let versioned = ctx.protocol.is_specified();
    let (capabilities, port_type) = if versioned {
        (
            base | PortCapabilities::UMP_ENDPOINT,
            PortType::MIDI_MASK | PortType::MIDI_UMP,
        )
    } else {
        (base, PortType::MIDI_MASK)
    };

    if !ctx.application_name.is_empty() {
        seq.set_client_name(&ctx.application_name)?;
    }
    if versioned {
        let mut client = seq.client_info()?;
        client.midi_version = ctx.protocol;
        seq.set_client_info(&client)?;
    }

    let port = seq.create_port(&ctx.port_name, capabilities, port_type);
    if port < 0 {
        return Err(Error::PortCreation(port));
    }
    if versioned {
        let applied = seq.port_info(port).and_then(|mut info| {
            info.ump_group = Some(ctx.ump_group);
            seq.set_port_info(port, &info)
        });
        if let Err(e) = applied {
            delete_after_failure(seq, port);
            return Err(e);
        }
    }

    match describe_local(seq, port) {
        Ok(local) => {
            tracing::debug!(
                "Created virtual MIDI port {} ({}, {:?})",
                local.address(),
                ctx.port_name,
                ctx.protocol
            );
            Ok(local)
        }
        Err(e) => {
            delete_after_failure(seq, port);
            Err(e)
        }
    }
}
