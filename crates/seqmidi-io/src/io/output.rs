//! Output stream: raw frames out of the local port, with optional delay.

use super::{release_port, ConnectionState, MidiOutput, MidiPort, Teardown};
use crate::error::{Error, Result};
use crate::port::{PortDescriptor, ProtocolVersion};
use crate::sequencer::Sequencer;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Sends are not serialised: share one stream across threads only with
/// external ordering.
pub struct MidiOutputStream {
    seq: Arc<dyn Sequencer>,
    details: PortDescriptor,
    local: PortDescriptor,
    teardown: Teardown,
    closed: Mutex<bool>,
}

impl MidiOutputStream {
    pub(crate) fn new(
        seq: Arc<dyn Sequencer>,
        details: PortDescriptor,
        local: PortDescriptor,
        teardown: Teardown,
    ) -> Self {
        tracing::debug!(
            "MIDI output open: {} -> {} ({})",
            local.address(),
            details.address(),
            details.name()
        );
        Self {
            seq,
            details,
            local,
            teardown,
            closed: Mutex::new(false),
        }
    }
}

impl MidiPort for MidiOutputStream {
    fn details(&self) -> &PortDescriptor {
        &self.details
    }

    fn local_port(&self) -> &PortDescriptor {
        &self.local
    }

    fn connection_state(&self) -> ConnectionState {
        if *self.closed.lock() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    fn protocol(&self) -> ProtocolVersion {
        self.details.protocol()
    }

    fn set_protocol(&self, _protocol: ProtocolVersion) -> Result<()> {
        Err(Error::UnsupportedOperation(
            "the MIDI protocol of an open port cannot be changed",
        ))
    }

    fn close(&self) -> Result<()> {
        let mut closed = self.closed.lock();
        if *closed {
            return Ok(());
        }
        *closed = true;
        release_port(self.seq.as_ref(), &self.local, self.teardown)
    }
}

impl MidiOutput for MidiOutputStream {
    fn send(&self, data: &[u8], timestamp_nanos: u64) -> Result<()> {
        if *self.closed.lock() {
            return Err(Error::StreamClosed);
        }
        // Delivery time is a delay relative to now; the caller thread waits.
        if timestamp_nanos > 0 {
            spin_sleep::sleep(Duration::from_nanos(timestamp_nanos));
        }
        self.seq.send(self.local.address().port, data)
    }
}

impl Drop for MidiOutputStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Closing MIDI output {} on drop failed: {}", self.local.address(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{PortCapabilities, PortType};
    use crate::sequencer::{IoMode, IoType, MemoryBackend, SequencerBackend};
    use std::time::Instant;

    fn virtual_output(backend: &MemoryBackend) -> MidiOutputStream {
        let seq: Arc<dyn Sequencer> =
            Arc::new(backend.open(IoType::Duplex, IoMode::NonBlocking).unwrap());
        let port = seq.create_port(
            "tx",
            PortCapabilities::VIRTUAL_SENDER,
            PortType::MIDI_MASK,
        );
        let info = seq.port_info(port).unwrap();
        let client = seq.client_info().unwrap();
        let local = PortDescriptor::from_info(info, &client);
        MidiOutputStream::new(seq, local.clone(), local, Teardown::DeleteOnly)
    }

    #[test]
    fn test_send_reaches_subscriber() {
        let backend = MemoryBackend::new();
        let output = virtual_output(&backend);
        let dev = backend.add_client("Synth");
        let (sink, frames) = backend.add_sink(dev, "Synth In").unwrap();
        backend
            .open(IoType::Duplex, IoMode::NonBlocking)
            .unwrap()
            .subscribe(output.local_port().address(), sink)
            .unwrap();

        output.send(&[0xB0, 7, 127], 0).unwrap();
        let got = frames.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(got, vec![0xB0, 7, 127]);
    }

    #[test]
    fn test_scheduled_send_waits() {
        let backend = MemoryBackend::new();
        let output = virtual_output(&backend);

        let start = Instant::now();
        output.send(&[0xF8], 20_000_000).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_send_after_close_fails() {
        let backend = MemoryBackend::new();
        let output = virtual_output(&backend);
        output.close().unwrap();
        assert!(matches!(output.send(&[0xF8], 0), Err(Error::StreamClosed)));
        assert!(matches!(
            output.set_protocol(ProtocolVersion::Midi1),
            Err(Error::UnsupportedOperation(_))
        ));
    }
}
