//! Recording doubles for the device session and the display.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::error::{Error, Result};
use crate::scan::ScanBatch;
use crate::session::{DeviceSession, ScanStream, SessionState};
use crate::shutdown::ShutdownSignal;
use crate::sink::{DisplaySink, SinkState};
use crate::transform::{FrameBuffer, PointCartesian};

/// Calls made on the doubles, in order.
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<&'static str> {
    journal.lock().unwrap().clone()
}

pub fn count(journal: &Journal, entry: &str) -> usize {
    journal.lock().unwrap().iter().filter(|e| **e == entry).count()
}

pub struct MockSession {
    journal: Journal,
    batches: Option<Receiver<Result<ScanBatch>>>,
    state: SessionState,
    fail_stop: bool,
}

impl MockSession {
    pub fn new(journal: Journal, batches: Receiver<Result<ScanBatch>>) -> MockSession {
        MockSession {
            journal,
            batches: Some(batches),
            state: SessionState::Ready,
            fail_stop: false,
        }
    }

    pub fn fail_stop(mut self) -> MockSession {
        self.fail_stop = true;
        self
    }
}

impl DeviceSession for MockSession {
    fn scans(&mut self) -> Result<ScanStream> {
        self.journal.lock().unwrap().push("scans");
        let batches = self.batches.take().ok_or(Error::ScanAlreadyStarted)?;
        self.state = SessionState::Scanning;
        Ok(ScanStream::new(batches))
    }

    fn stop(&mut self) -> Result<()> {
        self.journal.lock().unwrap().push("stop");
        if self.fail_stop {
            return Err(Error::Protocol("no answer to STOP".to_string()));
        }
        self.state = SessionState::Stopped;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.journal.lock().unwrap().push("disconnect");
        self.state = SessionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

pub struct MockSink {
    journal: Journal,
    frames: Vec<Vec<PointCartesian>>,
    n_pauses: usize,
    close_on_pause: Option<usize>,
    interrupt_on_pause: Option<(usize, ShutdownSignal)>,
}

impl MockSink {
    pub fn new(journal: Journal) -> MockSink {
        MockSink {
            journal,
            frames: Vec::new(),
            n_pauses: 0,
            close_on_pause: None,
            interrupt_on_pause: None,
        }
    }

    /// Reports the display as closed on the `n`th pause.
    pub fn close_on_pause(mut self, n: usize) -> MockSink {
        self.close_on_pause = Some(n);
        self
    }

    /// Fires `signal` in the middle of the `n`th pause.
    pub fn interrupt_on_pause(mut self, n: usize, signal: &ShutdownSignal) -> MockSink {
        self.interrupt_on_pause = Some((n, signal.clone()));
        self
    }

    pub fn frames(&self) -> Vec<Vec<PointCartesian>> {
        self.frames.clone()
    }
}

impl DisplaySink for MockSink {
    fn show_points(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.journal.lock().unwrap().push("show");
        self.frames.push(frame.points().to_vec());
        Ok(())
    }

    fn pause(&mut self, interval: Duration) -> Result<SinkState> {
        self.journal.lock().unwrap().push("pause");
        self.n_pauses += 1;
        if let Some((n, signal)) = &self.interrupt_on_pause {
            if *n == self.n_pauses {
                signal.trigger();
            }
        }
        std::thread::sleep(interval);
        if self.close_on_pause == Some(self.n_pauses) {
            return Ok(SinkState::Closed);
        }
        Ok(SinkState::Open)
    }

    fn close(&mut self) {
        self.journal.lock().unwrap().push("close");
    }
}
