//! ALSA sequencer backend.
//!
//! Raw MIDI bytes are converted to and from sequencer events with
//! `snd_midi_event` coders. One `Seq` can carry several listening ports
//! (the shared virtual-port handle does), so every receive thread drains the
//! whole client queue and routes frames to the owning port's channel.

use super::{
    ClientInfo, FrameHandler, IoMode, IoType, Listener, PortInfo, Sequencer, SequencerBackend,
    SubscriptionDirection,
};
use crate::error::{Error, Result};
use crate::port::{PortAddress, PortCapabilities, PortType, ProtocolVersion};
use alsa::seq::{self, Addr, ClientIter, PortSubscribe, PortSubscribeIter, QuerySubsType, Seq};
use alsa::{Direction, PollDescriptors};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::CString;
use std::sync::Arc;

/// How long a receive thread waits in poll() before rechecking stop/routes.
const POLL_INTERVAL_MS: i32 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct AlsaBackend;

impl SequencerBackend for AlsaBackend {
    type Handle = AlsaSequencer;

    fn name(&self) -> &'static str {
        "ALSA"
    }

    fn open(&self, io: IoType, mode: IoMode) -> Result<AlsaSequencer> {
        let direction = match io {
            IoType::Duplex => None,
            IoType::Input => Some(Direction::Capture),
            IoType::Output => Some(Direction::Playback),
        };
        let seq = Seq::open(None, direction, mode == IoMode::NonBlocking)?;
        let client = seq.client_id()?;
        tracing::debug!("Opened ALSA sequencer client {} ({:?}, {:?})", client, io, mode);
        Ok(AlsaSequencer {
            shared: Arc::new(Shared {
                seq: Mutex::new(seq),
                routes: Mutex::new(HashMap::new()),
            }),
            client,
            midi_version: Mutex::new(ProtocolVersion::Unspecified),
        })
    }
}

struct Shared {
    seq: Mutex<Seq>,
    routes: Mutex<HashMap<i32, Sender<Vec<u8>>>>,
}

pub struct AlsaSequencer {
    shared: Arc<Shared>,
    client: i32,
    /// The alsa bindings do not expose snd_seq_client_info_set_midi_version,
    /// so the requested version is only tracked here.
    midi_version: Mutex<ProtocolVersion>,
}

fn c_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|e| Error::Sequencer(format!("invalid name '{}': {}", name, e)))
}

fn addr(address: PortAddress) -> Addr {
    Addr {
        client: address.client,
        port: address.port,
    }
}

fn client_info_from(info: &seq::ClientInfo) -> ClientInfo {
    ClientInfo {
        client: info.get_client(),
        name: info.get_name().unwrap_or("").to_string(),
        midi_version: ProtocolVersion::Unspecified,
    }
}

fn port_info_from(info: &seq::PortInfo) -> PortInfo {
    PortInfo {
        address: PortAddress::new(info.get_client(), info.get_port()),
        name: info.get_name().unwrap_or("").to_string(),
        capabilities: PortCapabilities::from_bits_retain(info.get_capability().bits()),
        port_type: PortType::from_bits_retain(info.get_type().bits()),
        ump_group: None,
    }
}

/// `snd_midi_event_decode` reports events with no MIDI byte form this way.
const ENOENT: i32 = 2;

/// Reads every pending event and routes its bytes to the destination port's
/// channel.
///
/// SysEx is taken from the event's external data and split into
/// buffer-sized frames, in order. Events with no MIDI form (port
/// announcements, echoes) are skipped. Any other decode failure ends the
/// receive loop.
fn drain_events(shared: &Shared, decoder: &seq::MidiEvent, buffer: &mut [u8]) -> Result<()> {
    let seq = shared.seq.lock();
    let mut input = seq.input();
    while input.event_input_pending(true)? > 0 {
        let mut event = input.event_input()?;
        let dest = event.get_dest().port;
        let routes = shared.routes.lock();
        let Some(route) = routes.get(&dest) else {
            continue;
        };

        if event.get_type() == seq::EventType::Sysex {
            let data = event.get_ext().unwrap_or(&[]);
            for chunk in data.chunks(buffer.len()) {
                let _ = route.send(chunk.to_vec());
            }
            continue;
        }

        match decoder.decode(buffer, &mut event) {
            Ok(0) => {}
            Ok(len) => {
                let _ = route.send(buffer[..len].to_vec());
            }
            Err(e) if e.errno().abs() == ENOENT => {}
            Err(e) => {
                return Err(Error::Sequencer(format!(
                    "decoding {:?} event for port {}: {}",
                    event.get_type(),
                    dest,
                    e
                )))
            }
        }
    }
    Ok(())
}

impl Sequencer for AlsaSequencer {
    fn client_id(&self) -> i32 {
        self.client
    }

    fn next_client(&self, after: Option<i32>) -> Option<ClientInfo> {
        let seq = self.shared.seq.lock();
        let found = ClientIter::new(&seq)
            .find(|c| after.map_or(true, |a| c.get_client() > a))
            .map(|c| client_info_from(&c));
        found
    }

    fn next_port(&self, client: i32, after: Option<i32>) -> Option<PortInfo> {
        let seq = self.shared.seq.lock();
        let found = seq::PortIter::new(&seq, client)
            .find(|p| after.map_or(true, |a| p.get_port() > a))
            .map(|p| port_info_from(&p));
        found
    }

    fn create_port(&self, name: &str, capabilities: PortCapabilities, port_type: PortType) -> i32 {
        let name = match c_name(name) {
            Ok(name) => name,
            // EINVAL
            Err(_) => return -22,
        };
        let seq = self.shared.seq.lock();
        match seq.create_simple_port(
            &name,
            seq::PortCap::from_bits_truncate(capabilities.bits()),
            seq::PortType::from_bits_truncate(port_type.bits()),
        ) {
            Ok(port) => port,
            Err(e) => -e.errno().abs(),
        }
    }

    fn delete_port(&self, port: i32) -> Result<()> {
        self.shared.seq.lock().delete_port(port)?;
        Ok(())
    }

    fn subscribe(&self, sender: PortAddress, destination: PortAddress) -> Result<()> {
        let subscription = PortSubscribe::empty()?;
        subscription.set_sender(addr(sender));
        subscription.set_dest(addr(destination));
        self.shared.seq.lock().subscribe_port(&subscription)?;
        Ok(())
    }

    fn query_subscribers(
        &self,
        address: PortAddress,
        direction: SubscriptionDirection,
        index: usize,
    ) -> Option<PortAddress> {
        let kind = match direction {
            SubscriptionDirection::Read => QuerySubsType::READ,
            SubscriptionDirection::Write => QuerySubsType::WRITE,
        };
        let seq = self.shared.seq.lock();
        let found = PortSubscribeIter::new(&seq, addr(address), kind)
            .nth(index)
            .map(|sub| {
                let remote = match direction {
                    SubscriptionDirection::Read => sub.get_dest(),
                    SubscriptionDirection::Write => sub.get_sender(),
                };
                PortAddress::new(remote.client, remote.port)
            });
        found
    }

    fn disconnect(
        &self,
        local_port: i32,
        remote: PortAddress,
        direction: SubscriptionDirection,
    ) -> Result<()> {
        let local = PortAddress::new(self.client, local_port);
        let (sender, dest) = match direction {
            SubscriptionDirection::Read => (local, remote),
            SubscriptionDirection::Write => (remote, local),
        };
        self.shared
            .seq
            .lock()
            .unsubscribe_port(addr(sender), addr(dest))?;
        Ok(())
    }

    fn send(&self, port: i32, data: &[u8]) -> Result<()> {
        let encoder = seq::MidiEvent::new(data.len().max(16) as u32)?;
        encoder.enable_running_status(false);
        let seq = self.shared.seq.lock();
        let mut rest = data;
        while !rest.is_empty() {
            let (consumed, event) = encoder.encode(rest)?;
            if let Some(mut event) = event {
                event.set_source(port);
                event.set_subs();
                event.set_direct();
                seq.event_output_direct(&mut event)?;
            }
            if consumed == 0 {
                break;
            }
            rest = &rest[consumed..];
        }
        Ok(())
    }

    fn start_listening(
        &self,
        port: i32,
        buffer_size: usize,
        mut handler: FrameHandler,
    ) -> Result<Listener> {
        let shared = Arc::clone(&self.shared);
        let mut fds = {
            let seq = shared.seq.lock();
            (&*seq, Some(Direction::Capture)).get()?
        };
        let (route_tx, route_rx) = unbounded();
        shared.routes.lock().insert(port, route_tx);

        let name = format!("seqmidi-rx-{}:{}", self.client, port);
        Listener::spawn(name, move |stop| {
            let decoder = seq::MidiEvent::new(buffer_size as u32)?;
            decoder.enable_running_status(false);
            let mut buffer = vec![0u8; buffer_size.max(1)];

            let result = loop {
                if stop.is_raised() {
                    break Ok(());
                }
                match alsa::poll::poll(&mut fds, POLL_INTERVAL_MS) {
                    Ok(ready) if ready > 0 => {
                        if let Err(e) = drain_events(&shared, &decoder, &mut buffer) {
                            break Err(e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => break Err(e.into()),
                }
                while let Ok(frame) = route_rx.try_recv() {
                    handler(&frame);
                }
            };
            shared.routes.lock().remove(&port);
            result
        })
    }

    fn port_info(&self, port: i32) -> Result<PortInfo> {
        let info = self
            .shared
            .seq
            .lock()
            .get_any_port_info(addr(PortAddress::new(self.client, port)))?;
        Ok(port_info_from(&info))
    }

    fn set_port_info(&self, port: i32, info: &PortInfo) -> Result<()> {
        if let Some(group) = info.ump_group {
            tracing::warn!(
                "UMP group {} for port {}:{} not applied: not exposed by the alsa bindings",
                group,
                self.client,
                port
            );
        }
        Ok(())
    }

    fn set_client_name(&self, name: &str) -> Result<()> {
        let name = c_name(name)?;
        self.shared.seq.lock().set_client_name(&name)?;
        Ok(())
    }

    fn client_info(&self) -> Result<ClientInfo> {
        let info = self.shared.seq.lock().get_any_client_info(self.client)?;
        let mut info = client_info_from(&info);
        info.midi_version = *self.midi_version.lock();
        Ok(info)
    }

    fn set_client_info(&self, info: &ClientInfo) -> Result<()> {
        self.set_client_name(&info.name)?;
        if info.midi_version.is_specified() {
            tracing::warn!(
                "Client {} MIDI version {:?} recorded locally only: not exposed by the alsa bindings",
                self.client,
                info.midi_version
            );
        }
        *self.midi_version.lock() = info.midi_version;
        Ok(())
    }
}
