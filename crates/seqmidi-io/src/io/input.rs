//! Input stream: a receive loop feeding the registered callback.

use super::{release_port, ConnectionState, MidiInput, MidiPort, Teardown};
use crate::error::{Error, Result};
use crate::port::{PortDescriptor, ProtocolVersion};
use crate::sequencer::{FrameHandler, Listener, ListenerStatus, Sequencer};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Receives `(frame, timestamp_nanos)` on the stream's receive thread.
///
/// The sequencer provides no hardware timestamp; it is always 0.
pub type InputCallback = dyn Fn(&[u8], u64) + Send + Sync + 'static;

pub struct MidiInputStream {
    seq: Arc<dyn Sequencer>,
    details: PortDescriptor,
    local: PortDescriptor,
    teardown: Teardown,
    callback: Arc<ArcSwapOption<Box<InputCallback>>>,
    closed: AtomicBool,
    status: Arc<ListenerStatus>,
    receive_thread: Option<ThreadId>,
    /// Held for the whole teardown; `None` once the loop has been stopped.
    listener: Mutex<Option<Listener>>,
}

impl MidiInputStream {
    /// Starts the receive loop on `local`. On failure the local port is
    /// released before the error is returned.
    pub(crate) fn start(
        seq: Arc<dyn Sequencer>,
        details: PortDescriptor,
        local: PortDescriptor,
        teardown: Teardown,
        buffer_size: usize,
    ) -> Result<Self> {
        let callback: Arc<ArcSwapOption<Box<InputCallback>>> = Arc::new(ArcSwapOption::empty());
        let slot = Arc::clone(&callback);
        let handler: FrameHandler = Box::new(move |frame: &[u8]| {
            if let Some(callback) = &*slot.load() {
                callback(frame, 0);
            }
        });

        let listener = match seq.start_listening(local.address().port, buffer_size, handler) {
            Ok(listener) => listener,
            Err(e) => {
                if let Err(release) = release_port(seq.as_ref(), &local, teardown) {
                    tracing::warn!("Failed to release {}: {}", local.address(), release);
                }
                return Err(e);
            }
        };
        tracing::debug!(
            "MIDI input open: {} <- {} ({})",
            local.address(),
            details.address(),
            details.name()
        );

        Ok(Self {
            seq,
            details,
            local,
            teardown,
            callback,
            closed: AtomicBool::new(false),
            status: listener.status(),
            receive_thread: listener.thread_id(),
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Registers a closure as the callback (see [`MidiInput::set_callback`]).
    pub fn on_receive<F>(&self, callback: F)
    where
        F: Fn(&[u8], u64) + Send + Sync + 'static,
    {
        self.set_callback(Box::new(callback));
    }

    /// Error that ended the receive loop, if it failed.
    pub fn last_error(&self) -> Option<String> {
        self.status.last_error()
    }
}

impl MidiPort for MidiInputStream {
    fn details(&self) -> &PortDescriptor {
        &self.details
    }

    fn local_port(&self) -> &PortDescriptor {
        &self.local
    }

    fn connection_state(&self) -> ConnectionState {
        if self.closed.load(Ordering::Acquire) {
            ConnectionState::Closed
        } else if self.status.has_failed() {
            ConnectionState::Failed
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
        self.closed.store(true, Ordering::Release);

        // A callback closing its own stream must not wait on a closer that
        // is joining the callback's thread.
        let mut slot = if self.receive_thread == Some(thread::current().id()) {
            match self.listener.try_lock() {
                Some(slot) => slot,
                None => return Ok(()),
            }
        } else {
            self.listener.lock()
        };
        let Some(mut listener) = slot.take() else {
            return Ok(());
        };
        // Off the receive thread, the loop is gone before the port is deleted.
        listener.stop();
        self.callback.store(None);
        release_port(self.seq.as_ref(), &self.local, self.teardown)
    }
}

impl MidiInput for MidiInputStream {
    fn set_callback(&self, callback: Box<InputCallback>) {
        self.callback.store(Some(Arc::new(callback)));
    }

    fn clear_callback(&self) {
        self.callback.store(None);
    }
}

impl Drop for MidiInputStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Closing MIDI input {} on drop failed: {}", self.local.address(), e);
        }
    }
}
