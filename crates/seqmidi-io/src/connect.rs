//! Local application ports routed to or from a device port.
//!
//! The local port gets the capabilities complementary to the target's and is
//! hidden from other clients. Either the subscription exists when these
//! functions return, or the local port has been deleted again.

use crate::error::{Error, Result};
use crate::port::{PortAddress, PortCapabilities, PortDescriptor, PortType};
use crate::sequencer::Sequencer;

/// Creates a local port receiving from `target` (target → local).
pub fn connect_for_input<S: Sequencer + ?Sized>(
    seq: &S,
    target: &PortDescriptor,
    name: &str,
) -> Result<PortDescriptor> {
    let local = create_local_port(seq, name, PortCapabilities::INPUT_CONNECTED)?;
    subscribe_or_release(seq, &local, target.address(), local.address())?;
    Ok(local)
}

/// Creates a local port sending to `target` (local → target).
pub fn connect_for_output<S: Sequencer + ?Sized>(
    seq: &S,
    target: &PortDescriptor,
    name: &str,
) -> Result<PortDescriptor> {
    let local = create_local_port(seq, name, PortCapabilities::OUTPUT_CONNECTED)?;
    subscribe_or_release(seq, &local, local.address(), target.address())?;
    Ok(local)
}

fn create_local_port<S: Sequencer + ?Sized>(
    seq: &S,
    name: &str,
    capabilities: PortCapabilities,
) -> Result<PortDescriptor> {
    let port = seq.create_port(name, capabilities, PortType::MIDI_MASK);
    if port < 0 {
        return Err(Error::PortCreation(port));
    }
    match describe_local(seq, port) {
        Ok(local) => {
            tracing::debug!("Created MIDI port {} ({})", local.address(), name);
            Ok(local)
        }
        Err(e) => {
            delete_after_failure(seq, port);
            Err(e)
        }
    }
}

/// Descriptor of one of `seq`'s own ports.
pub(crate) fn describe_local<S: Sequencer + ?Sized>(seq: &S, port: i32) -> Result<PortDescriptor> {
    let info = seq.port_info(port)?;
    let client = seq.client_info()?;
    Ok(PortDescriptor::from_info(info, &client))
}

pub(crate) fn delete_after_failure<S: Sequencer + ?Sized>(seq: &S, port: i32) {
    if let Err(e) = seq.delete_port(port) {
        tracing::warn!("Failed to delete port {}:{}: {}", seq.client_id(), port, e);
    }
}

fn subscribe_or_release<S: Sequencer + ?Sized>(
    seq: &S,
    local: &PortDescriptor,
    sender: PortAddress,
    destination: PortAddress,
) -> Result<()> {
    match seq.subscribe(sender, destination) {
        Ok(()) => {
            tracing::debug!("Subscribed {} -> {}", sender, destination);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Subscription {} -> {} failed: {}", sender, destination, e);
            delete_after_failure(seq, local.address().port);
            Err(e)
        }
    }
}
