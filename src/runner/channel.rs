//! One-shot result channel
//!
//! A unit of work runs on its own thread and hands exactly one `Result` back
//! to the caller, which blocks until it arrives. Used for process spawns and
//! modification-time scans so that each runs isolated from the sequential
//! dispatch loop.

use crate::error::{ExecutionError, KickError, Result};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use tracing::debug;

/// Sending half; consumed by `send` so a result can only be delivered once
pub struct ResultSender<T> {
    tx: SyncSender<Result<T>>,
}

/// Receiving half; consumed by `recv`
pub struct ResultReceiver<T> {
    label: String,
    rx: Receiver<Result<T>>,
}

/// Create a one-slot channel for a single unit of work named `label`
pub fn channel<T>(label: impl Into<String>) -> (ResultSender<T>, ResultReceiver<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (
        ResultSender { tx },
        ResultReceiver {
            label: label.into(),
            rx,
        },
    )
}

impl<T> ResultSender<T> {
    /// Deliver the outcome. A dropped receiver is not an error for the worker.
    pub fn send(self, result: Result<T>) {
        let _ = self.tx.send(result);
    }
}

impl<T> ResultReceiver<T> {
    /// Block until the worker delivers its result
    pub fn recv(self) -> Result<T> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::WorkerLost(self.label).into()),
        }
    }
}

/// Run `work` on a dedicated thread and wait for its result
pub fn run_isolated<T, F>(label: &str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (sender, receiver) = channel(label);

    debug!(unit = label, "spawning worker");
    thread::Builder::new()
        .name(format!("kick-{}", label))
        .spawn(move || sender.send(work()))
        .map_err(KickError::Io)?;

    receiver.recv()
}
