//! Port discovery over a sequencer handle.
//!
//! Walks the client/port cursors from before-first until exhausted. Nothing
//! is cached; every query reflects the sequencer at the time of the walk.

use crate::port::{PortCapabilities, PortDescriptor};
use crate::sequencer::{ClientInfo, Sequencer};

/// Lazy walk over every MIDI port whose capabilities contain `required`.
pub struct PortIter<'a, S: Sequencer + ?Sized> {
    seq: &'a S,
    required: PortCapabilities,
    client: Option<ClientInfo>,
    last_port: Option<i32>,
    done: bool,
}

pub fn ports_matching<S: Sequencer + ?Sized>(
    seq: &S,
    required: PortCapabilities,
) -> PortIter<'_, S> {
    PortIter {
        seq,
        required,
        client: None,
        last_port: None,
        done: false,
    }
}

impl<'a, S: Sequencer + ?Sized> PortIter<'a, S> {
    fn advance_client(&mut self) -> bool {
        let after = self.client.as_ref().map(|c| c.client);
        self.client = self.seq.next_client(after);
        self.last_port = None;
        self.client.is_some()
    }
}

impl<'a, S: Sequencer + ?Sized> Iterator for PortIter<'a, S> {
    type Item = PortDescriptor;

    fn next(&mut self) -> Option<PortDescriptor> {
        if self.done {
            return None;
        }
        if self.client.is_none() && !self.advance_client() {
            self.done = true;
            return None;
        }
        loop {
            let client = self.client.as_ref()?;
            match self.seq.next_port(client.client, self.last_port) {
                Some(info) => {
                    self.last_port = Some(info.address.port);
                    if info.port_type.is_midi() && info.capabilities.contains(self.required) {
                        return Some(PortDescriptor::from_info(info, client));
                    }
                }
                None => {
                    if !self.advance_client() {
                        self.done = true;
                        return None;
                    }
                }
            }
        }
    }
}

/// Ports other clients can read from.
pub fn list_inputs<S: Sequencer + ?Sized>(seq: &S) -> Vec<PortDescriptor> {
    ports_matching(seq, PortCapabilities::INPUT_REQUIRED).collect()
}

/// Ports other clients can write to.
pub fn list_outputs<S: Sequencer + ?Sized>(seq: &S) -> Vec<PortDescriptor> {
    ports_matching(seq, PortCapabilities::OUTPUT_REQUIRED).collect()
}

pub fn find_input<S: Sequencer + ?Sized>(seq: &S, id: &str) -> Option<PortDescriptor> {
    ports_matching(seq, PortCapabilities::INPUT_REQUIRED).find(|p| p.id() == id)
}

pub fn find_output<S: Sequencer + ?Sized>(seq: &S, id: &str) -> Option<PortDescriptor> {
    ports_matching(seq, PortCapabilities::OUTPUT_REQUIRED).find(|p| p.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortType;
    use crate::sequencer::{IoMode, IoType, MemoryBackend, SequencerBackend};

    #[test]
    fn test_empty_system() {
        let backend = MemoryBackend::new();
        let seq = backend.open(IoType::Duplex, IoMode::NonBlocking).unwrap();
        assert!(list_inputs(&seq).is_empty());
        assert!(list_outputs(&seq).is_empty());
    }

    #[test]
    fn test_filter_masks() {
        let backend = MemoryBackend::new();
        let dev = backend.add_client("Device");
        // Readable but not subscribable
        backend
            .add_port(dev, "read only", PortCapabilities::READ, PortType::MIDI_GENERIC)
            .unwrap();
        // Not a MIDI type
        backend
            .add_port(
                dev,
                "sampler",
                PortCapabilities::INPUT_REQUIRED,
                PortType::SAMPLE,
            )
            .unwrap();
        let good = backend
            .add_port(
                dev,
                "out",
                PortCapabilities::INPUT_REQUIRED | PortCapabilities::SYNC_READ,
                PortType::APPLICATION,
            )
            .unwrap();
        let seq = backend.open(IoType::Duplex, IoMode::NonBlocking).unwrap();

        let inputs = list_inputs(&seq);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].address(), good);
        for port in &inputs {
            assert!(port.capabilities().contains(PortCapabilities::INPUT_REQUIRED));
            assert!(port.port_type().is_midi());
        }
        assert!(list_outputs(&seq).is_empty());
    }

    #[test]
    fn test_walk_skips_empty_clients() {
        let backend = MemoryBackend::new();
        let a = backend.add_client("A");
        backend.add_client("Empty");
        let b = backend.add_client("B");
        let pa = backend
            .add_port(a, "a", PortCapabilities::INPUT_REQUIRED, PortType::MIDI_GENERIC)
            .unwrap();
        let pb = backend
            .add_port(b, "b", PortCapabilities::INPUT_REQUIRED, PortType::MIDI_GENERIC)
            .unwrap();
        let seq = backend.open(IoType::Duplex, IoMode::NonBlocking).unwrap();

        let found: Vec<_> = list_inputs(&seq).iter().map(|p| p.address()).collect();
        assert_eq!(found, vec![pa, pb]);
    }

    #[test]
    fn test_find_by_id() {
        let backend = MemoryBackend::new();
        let dev = backend.add_client("Synth");
        let sink = backend
            .add_port(dev, "in", PortCapabilities::OUTPUT_REQUIRED, PortType::MIDI_GENERIC)
            .unwrap();
        let seq = backend.open(IoType::Duplex, IoMode::NonBlocking).unwrap();

        let found = find_output(&seq, &sink.id()).unwrap();
        assert_eq!(found.name(), "in");
        assert_eq!(found.manufacturer(), "Synth");
        assert!(find_input(&seq, &sink.id()).is_none());
        assert!(find_output(&seq, "999_0").is_none());
    }
}
