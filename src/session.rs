//! Boundary between the viewer and the range finder.

use std::time::Duration;

use crossbeam_channel::{select, Receiver};

use crate::error::{Error, Result};
use crate::scan::ScanBatch;

/// Lifecycle of a device connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Handle opened.
    Created,
    /// Any prior scan stopped.
    Ready,
    Scanning,
    Stopped,
    /// Handle released. Terminal.
    Disconnected,
}

/// A connection to a rotating range finder.
pub trait DeviceSession {
    /// Starts scanning and returns the sequence of rotations.
    /// The sequence can be taken only once per session.
    fn scans(&mut self) -> Result<ScanStream>;

    /// Halts any scan in progress. Calling it again has no further effect.
    fn stop(&mut self) -> Result<()>;

    /// Releases the device handle. Expected to follow `stop`.
    fn disconnect(&mut self) -> Result<()>;

    fn state(&self) -> SessionState;
}

/// Result of a pull on a [`ScanStream`].
#[derive(Debug, PartialEq)]
pub enum Pull {
    Batch(ScanBatch),
    /// The cancellation token fired before a rotation arrived.
    Cancelled,
    /// The producer is gone and no more rotations will come.
    Exhausted,
}

/// Receiving end of the rotations produced by a session.
pub struct ScanStream {
    batches: Receiver<Result<ScanBatch>>,
}

impl ScanStream {
    pub fn new(batches: Receiver<Result<ScanBatch>>) -> ScanStream {
        ScanStream { batches }
    }

    /// Blocks until the next rotation, a message on `cancel`, or `timeout`.
    /// Without a timeout a stalled device blocks until cancelled.
    pub fn next_batch(&self, cancel: &Receiver<()>, timeout: Option<Duration>) -> Result<Pull> {
        let message = match timeout {
            None => select! {
                recv(self.batches) -> message => message,
                recv(cancel) -> _ => return Ok(Pull::Cancelled),
            },
            Some(timeout) => select! {
                recv(self.batches) -> message => message,
                recv(cancel) -> _ => return Ok(Pull::Cancelled),
                default(timeout) => return Err(Error::ScanTimeout(timeout)),
            },
        };
        match message {
            Ok(Ok(batch)) => Ok(Pull::Batch(batch)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(Pull::Exhausted),
        }
    }
}
