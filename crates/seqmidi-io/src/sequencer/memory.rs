//! In-process sequencer.
//!
//! Models the parts of a host sequencer the access layer relies on: numbered
//! clients owning numbered ports, capability checks on subscription,
//! `NO_EXPORT` ports hidden from other clients, and frame routing along
//! subscriptions. Every handle opened from one [`MemoryBackend`] (and its
//! clones) sees the same client/port space.
//!
//! Besides backing the access layer, the backend doubles as a fixture:
//! [`MemoryBackend::add_client`] / [`MemoryBackend::add_port`] register
//! "devices", [`MemoryBackend::push_frame`] makes a device emit a frame.

use super::{
    ClientInfo, FrameHandler, IoMode, IoType, Listener, PortInfo, Sequencer, SequencerBackend,
    SubscriptionDirection,
};
use crate::error::{Error, Result};
use crate::port::{PortAddress, PortCapabilities, PortType, ProtocolVersion};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// User clients start here, like on ALSA.
const FIRST_USER_CLIENT: i32 = 128;

enum Delivery {
    Frame(Vec<u8>),
    Fault(String),
}

struct PortEntry {
    info: PortInfo,
    inbox_tx: Sender<Delivery>,
    inbox_rx: Receiver<Delivery>,
}

struct ClientEntry {
    info: ClientInfo,
    ports: BTreeMap<i32, PortEntry>,
    next_port: i32,
}

#[derive(Default)]
struct SystemState {
    clients: BTreeMap<i32, ClientEntry>,
    subscriptions: Vec<(PortAddress, PortAddress)>,
    next_client: i32,
    fail_subscriptions: bool,
    port_creation_error: Option<i32>,
}

impl SystemState {
    fn register_client(&mut self, name: &str) -> i32 {
        let id = self.next_client.max(FIRST_USER_CLIENT);
        self.next_client = id + 1;
        self.clients.insert(
            id,
            ClientEntry {
                info: ClientInfo {
                    client: id,
                    name: name.to_string(),
                    midi_version: ProtocolVersion::Unspecified,
                },
                ports: BTreeMap::new(),
                next_port: 0,
            },
        );
        id
    }

    fn port(&self, address: PortAddress) -> Option<&PortEntry> {
        self.clients
            .get(&address.client)
            .and_then(|c| c.ports.get(&address.port))
    }

    fn create_port(
        &mut self,
        client: i32,
        name: &str,
        capabilities: PortCapabilities,
        port_type: PortType,
    ) -> Option<PortAddress> {
        let entry = self.clients.get_mut(&client)?;
        let port = entry.next_port;
        entry.next_port += 1;
        let address = PortAddress::new(client, port);
        let (inbox_tx, inbox_rx) = unbounded();
        entry.ports.insert(
            port,
            PortEntry {
                info: PortInfo {
                    address,
                    name: name.to_string(),
                    capabilities,
                    port_type,
                    ump_group: None,
                },
                inbox_tx,
                inbox_rx,
            },
        );
        Some(address)
    }

    fn remove_port(&mut self, address: PortAddress) -> bool {
        let removed = self
            .clients
            .get_mut(&address.client)
            .and_then(|c| c.ports.remove(&address.port))
            .is_some();
        if removed {
            self.subscriptions
                .retain(|(s, d)| *s != address && *d != address);
        }
        removed
    }

    fn remove_client(&mut self, client: i32) {
        if self.clients.remove(&client).is_some() {
            self.subscriptions
                .retain(|(s, d)| s.client != client && d.client != client);
        }
    }

    /// Routes a frame from `sender` to every subscribed destination.
    fn route(&self, sender: PortAddress, data: &[u8]) -> usize {
        let mut delivered = 0;
        for (_, dest) in self.subscriptions.iter().filter(|(s, _)| *s == sender) {
            if let Some(port) = self.port(*dest) {
                if port.inbox_tx.send(Delivery::Frame(data.to_vec())).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

/// Shared in-process sequencer. Cloning yields another view of the same system.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<SystemState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device client that is not backed by any handle.
    pub fn add_client(&self, name: &str) -> i32 {
        self.state.lock().register_client(name)
    }

    /// Adds a port to an existing client. Returns `None` for an unknown client.
    pub fn add_port(
        &self,
        client: i32,
        name: &str,
        capabilities: PortCapabilities,
        port_type: PortType,
    ) -> Option<PortAddress> {
        self.state
            .lock()
            .create_port(client, name, capabilities, port_type)
    }

    pub fn remove_port(&self, address: PortAddress) -> bool {
        self.state.lock().remove_port(address)
    }

    /// Emits `data` from `sender` as if a device produced it.
    ///
    /// Returns the number of subscribed destinations reached.
    pub fn push_frame(&self, sender: PortAddress, data: &[u8]) -> usize {
        self.state.lock().route(sender, data)
    }

    /// Makes the next read on `address` fail with `reason`.
    pub fn inject_fault(&self, address: PortAddress, reason: &str) -> bool {
        let state = self.state.lock();
        match state.port(address) {
            Some(port) => port
                .inbox_tx
                .send(Delivery::Fault(reason.to_string()))
                .is_ok(),
            None => false,
        }
    }

    /// Registers a device port that records what it receives.
    pub fn add_sink(&self, client: i32, name: &str) -> Option<(PortAddress, Receiver<Vec<u8>>)> {
        let address = self.add_port(
            client,
            name,
            PortCapabilities::OUTPUT_REQUIRED,
            PortType::MIDI_GENERIC | PortType::HARDWARE,
        )?;
        let inbox = self.state.lock().port(address)?.inbox_rx.clone();
        let (tx, rx) = unbounded();
        std::thread::Builder::new()
            .name(format!("memory-sink-{}", address))
            .spawn(move || {
                while let Ok(delivery) = inbox.recv() {
                    if let Delivery::Frame(bytes) = delivery {
                        if tx.send(bytes).is_err() {
                            break;
                        }
                    }
                }
            })
            .ok()?;
        Some((address, rx))
    }

    pub fn subscriptions(&self) -> Vec<(PortAddress, PortAddress)> {
        self.state.lock().subscriptions.clone()
    }

    pub fn is_subscribed(&self, sender: PortAddress, destination: PortAddress) -> bool {
        self.state
            .lock()
            .subscriptions
            .contains(&(sender, destination))
    }

    pub fn port_info(&self, address: PortAddress) -> Option<PortInfo> {
        self.state.lock().port(address).map(|p| p.info.clone())
    }

    pub fn client_info(&self, client: i32) -> Option<ClientInfo> {
        self.state
            .lock()
            .clients
            .get(&client)
            .map(|c| c.info.clone())
    }

    pub fn client_count(&self) -> usize {
        self.state.lock().clients.len()
    }

    pub fn set_subscription_failure(&self, fail: bool) {
        self.state.lock().fail_subscriptions = fail;
    }

    /// Makes every following `create_port` return `code` (negative).
    pub fn set_port_creation_error(&self, code: Option<i32>) {
        self.state.lock().port_creation_error = code;
    }
}

impl SequencerBackend for MemoryBackend {
    type Handle = MemorySequencer;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, io: IoType, mode: IoMode) -> Result<MemorySequencer> {
        let client = self.state.lock().register_client("seqmidi");
        tracing::debug!("Opened memory sequencer client {} ({:?}, {:?})", client, io, mode);
        Ok(MemorySequencer {
            state: Arc::clone(&self.state),
            client,
            io,
        })
    }
}

/// Handle onto a [`MemoryBackend`]. Dropping it removes its client.
pub struct MemorySequencer {
    state: Arc<Mutex<SystemState>>,
    client: i32,
    io: IoType,
}

impl MemorySequencer {
    fn local(&self, port: i32) -> PortAddress {
        PortAddress::new(self.client, port)
    }
}

impl Sequencer for MemorySequencer {
    fn client_id(&self) -> i32 {
        self.client
    }

    fn next_client(&self, after: Option<i32>) -> Option<ClientInfo> {
        let state = self.state.lock();
        let mut clients = match after {
            Some(after) => state.clients.range(after.saturating_add(1)..),
            None => state.clients.range(..),
        };
        clients.next().map(|(_, c)| c.info.clone())
    }

    fn next_port(&self, client: i32, after: Option<i32>) -> Option<PortInfo> {
        let state = self.state.lock();
        let entry = state.clients.get(&client)?;
        let start = after.map(|a| a.saturating_add(1)).unwrap_or(i32::MIN);
        entry
            .ports
            .range(start..)
            .map(|(_, p)| &p.info)
            .find(|info| {
                client == self.client || !info.capabilities.contains(PortCapabilities::NO_EXPORT)
            })
            .cloned()
    }

    fn create_port(&self, name: &str, capabilities: PortCapabilities, port_type: PortType) -> i32 {
        let mut state = self.state.lock();
        if let Some(code) = state.port_creation_error {
            return code;
        }
        match state.create_port(self.client, name, capabilities, port_type) {
            Some(address) => address.port,
            // ENOENT: our client is gone
            None => -2,
        }
    }

    fn delete_port(&self, port: i32) -> Result<()> {
        if self.state.lock().remove_port(self.local(port)) {
            Ok(())
        } else {
            Err(Error::Sequencer(format!("no such port {}", self.local(port))))
        }
    }

    fn subscribe(&self, sender: PortAddress, destination: PortAddress) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_subscriptions {
            return Err(Error::Sequencer("subscription refused".to_string()));
        }
        let readable = state
            .port(sender)
            .map(|p| p.info.capabilities.contains(PortCapabilities::READ))
            .ok_or_else(|| Error::Sequencer(format!("no such sender {}", sender)))?;
        let writable = state
            .port(destination)
            .map(|p| p.info.capabilities.contains(PortCapabilities::WRITE))
            .ok_or_else(|| Error::Sequencer(format!("no such destination {}", destination)))?;
        if !readable || !writable {
            return Err(Error::Sequencer(format!(
                "cannot subscribe {} -> {}: missing capability",
                sender, destination
            )));
        }
        if !state.subscriptions.contains(&(sender, destination)) {
            state.subscriptions.push((sender, destination));
        }
        Ok(())
    }

    fn query_subscribers(
        &self,
        address: PortAddress,
        direction: SubscriptionDirection,
        index: usize,
    ) -> Option<PortAddress> {
        let state = self.state.lock();
        let mut matching = state.subscriptions.iter().filter_map(|(s, d)| match direction {
            SubscriptionDirection::Read if *s == address => Some(*d),
            SubscriptionDirection::Write if *d == address => Some(*s),
            _ => None,
        });
        matching.nth(index)
    }

    fn disconnect(
        &self,
        local_port: i32,
        remote: PortAddress,
        direction: SubscriptionDirection,
    ) -> Result<()> {
        let local = self.local(local_port);
        let edge = match direction {
            SubscriptionDirection::Read => (local, remote),
            SubscriptionDirection::Write => (remote, local),
        };
        let mut state = self.state.lock();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| *s != edge);
        if state.subscriptions.len() == before {
            return Err(Error::Sequencer(format!(
                "no subscription {} -> {}",
                edge.0, edge.1
            )));
        }
        Ok(())
    }

    fn send(&self, port: i32, data: &[u8]) -> Result<()> {
        if self.io == IoType::Input {
            return Err(Error::Sequencer(
                "handle was opened for input only".to_string(),
            ));
        }
        let state = self.state.lock();
        if state.port(self.local(port)).is_none() {
            return Err(Error::Sequencer(format!("no such port {}", self.local(port))));
        }
        state.route(self.local(port), data);
        Ok(())
    }

    fn start_listening(
        &self,
        port: i32,
        buffer_size: usize,
        mut handler: FrameHandler,
    ) -> Result<Listener> {
        if self.io == IoType::Output {
            return Err(Error::Sequencer(
                "handle was opened for output only".to_string(),
            ));
        }
        let address = self.local(port);
        let inbox = self
            .state
            .lock()
            .port(address)
            .map(|p| p.inbox_rx.clone())
            .ok_or_else(|| Error::Sequencer(format!("no such port {}", address)))?;

        Listener::spawn(format!("seqmidi-rx-{}", address), move |stop| {
            let mut buffer = vec![0u8; buffer_size.max(1)];
            loop {
                select! {
                    recv(inbox) -> delivery => match delivery {
                        Ok(Delivery::Frame(bytes)) => {
                            for chunk in bytes.chunks(buffer.len()) {
                                buffer[..chunk.len()].copy_from_slice(chunk);
                                handler(&buffer[..chunk.len()]);
                            }
                        }
                        Ok(Delivery::Fault(reason)) => return Err(Error::Sequencer(reason)),
                        // Port deleted underneath us
                        Err(_) => return Ok(()),
                    },
                    recv(stop.receiver()) -> _ => return Ok(()),
                }
            }
        })
    }

    fn port_info(&self, port: i32) -> Result<PortInfo> {
        self.state
            .lock()
            .port(self.local(port))
            .map(|p| p.info.clone())
            .ok_or_else(|| Error::Sequencer(format!("no such port {}", self.local(port))))
    }

    fn set_port_info(&self, port: i32, info: &PortInfo) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .clients
            .get_mut(&self.client)
            .and_then(|c| c.ports.get_mut(&port))
            .ok_or_else(|| Error::Sequencer(format!("no such port {}", self.local(port))))?;
        // Address is fixed by the sequencer
        entry.info = PortInfo {
            address: entry.info.address,
            ..info.clone()
        };
        Ok(())
    }

    fn set_client_name(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .clients
            .get_mut(&self.client)
            .ok_or_else(|| Error::Sequencer(format!("client {} is gone", self.client)))?;
        entry.info.name = name.to_string();
        Ok(())
    }

    fn client_info(&self) -> Result<ClientInfo> {
        self.state
            .lock()
            .clients
            .get(&self.client)
            .map(|c| c.info.clone())
            .ok_or_else(|| Error::Sequencer(format!("client {} is gone", self.client)))
    }

    fn set_client_info(&self, info: &ClientInfo) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .clients
            .get_mut(&self.client)
            .ok_or_else(|| Error::Sequencer(format!("client {} is gone", self.client)))?;
        entry.info = ClientInfo {
            client: self.client,
            ..info.clone()
        };
        Ok(())
    }
}

impl Drop for MemorySequencer {
    fn drop(&mut self) {
        self.state.lock().remove_client(self.client);
        tracing::debug!("Closed memory sequencer client {}", self.client);
    }
}
