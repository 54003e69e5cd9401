//! Receive-loop thread handle shared by all backends.
//!
//! A backend's `start_listening` spawns its read loop through
//! [`Listener::spawn`]. The loop gets a [`StopSignal`] and returns when it is
//! raised; `Listener::stop` raises it and joins the thread, so nothing reads
//! the port after `stop` returns.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Called on the receive thread with each inbound frame.
pub type FrameHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Stop side of a listener, handed to the read loop.
#[derive(Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    pub fn is_raised(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// For `crossbeam_channel::select!`: becomes ready when stop is raised.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// Outcome of a receive loop, readable after the [`Listener`] is gone.
#[derive(Default)]
pub struct ListenerStatus {
    failed: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl ListenerStatus {
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

pub struct Listener {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    status: Arc<ListenerStatus>,
}

impl Listener {
    /// Runs `body` on a named thread until it returns.
    ///
    /// An `Err` from `body` ends the loop for good: it is logged and recorded
    /// so the owning stream can report the failure. There is no restart.
    pub fn spawn<F>(name: String, body: F) -> Result<Self>
    where
        F: FnOnce(StopSignal) -> Result<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded(1);
        let status = Arc::new(ListenerStatus::default());
        let status_clone = Arc::clone(&status);
        let signal = StopSignal { rx: stop_rx };

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                if let Err(e) = body(signal) {
                    tracing::error!("MIDI receive loop {} stopped: {}", name, e);
                    *status_clone.last_error.lock() = Some(e.to_string());
                    status_clone.failed.store(true, Ordering::Release);
                }
            })
            .map_err(Error::Io)?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            status,
        })
    }

    /// Raises the stop signal and joins the loop. Idempotent.
    ///
    /// Called from the loop's own thread (a handler stopping its listener),
    /// the thread is detached instead and exits once the handler returns.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
            drop(tx);
        }
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                tracing::warn!("MIDI receive thread panicked");
            }
        }
    }

    /// Id of the receive thread while it has not been stopped.
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread.as_ref().map(|t| t.thread().id())
    }

    pub fn status(&self) -> Arc<ListenerStatus> {
        Arc::clone(&self.status)
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    pub fn has_failed(&self) -> bool {
        self.status.has_failed()
    }

    pub fn last_error(&self) -> Option<String> {
        self.status.last_error()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}
