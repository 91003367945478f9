//! Interrupt handling and ordered teardown.
//!
//! The interrupt handler only raises a [`ShutdownSignal`]. The render loop
//! notices it at its next suspension point and hands control back to a
//! [`ShutdownContext`], which owns the device session and the display and
//! releases them exactly once: stop the scan, disconnect, close the display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{Error, Result};
use crate::render_loop::{LoopExit, LoopSettings, RenderLoop};
use crate::session::DeviceSession;
use crate::sink::DisplaySink;

/// Cancellation token shared between the interrupt handler and the loop.
#[derive(Clone)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> ShutdownSignal {
        let (tx, rx) = bounded(1);
        ShutdownSignal {
            requested: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // a pending wake-up is enough
        let _ = self.tx.try_send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Becomes ready when the signal is triggered.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        ShutdownSignal::new()
    }
}

/// Routes SIGINT and SIGTERM to `signal`. Can be installed once per process.
pub fn install_interrupt_handler(signal: &ShutdownSignal) -> Result<()> {
    let signal = signal.clone();
    ctrlc::set_handler(move || {
        if !signal.is_triggered() {
            log::info!("Interrupt received. Stopping the LiDAR...");
        }
        signal.trigger();
    })?;
    Ok(())
}

/// Cleanup failures. They are logged and kept here, never raised.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub failures: Vec<(&'static str, Error)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: &'static str, result: Result<()>) {
        if let Err(e) = result {
            log::warn!("Cleanup step \"{}\" failed: {}", step, e);
            self.failures.push((step, e));
        }
    }
}

/// Stops then disconnects `session`, recording failures in `report`.
pub fn release_session<D: DeviceSession + ?Sized>(session: &mut D, report: &mut TeardownReport) {
    report.record("stop", session.stop());
    report.record("disconnect", session.disconnect());
}

/// How a run ended.
#[derive(Debug)]
pub struct Outcome {
    pub result: Result<LoopExit>,
    pub report: TeardownReport,
}

impl Outcome {
    /// 0 after a graceful shutdown, 1 when the loop failed.
    pub fn exit_code(&self) -> u8 {
        match self.result {
            Ok(_) => 0,
            Err(_) => 1,
        }
    }
}

/// Owns everything that has to be released on the way out.
pub struct ShutdownContext<D: DeviceSession, S: DisplaySink> {
    session: D,
    sink: S,
}

impl<D: DeviceSession, S: DisplaySink> ShutdownContext<D, S> {
    pub fn new(session: D, sink: S) -> Self {
        ShutdownContext { session, sink }
    }

    /// Runs the render loop until it returns for any reason, then tears down.
    pub fn run(mut self, signal: &ShutdownSignal, settings: &LoopSettings) -> Outcome {
        let mut render_loop = RenderLoop::new(settings.clone());
        let result = self
            .session
            .scans()
            .and_then(|stream| render_loop.run(&stream, &mut self.sink, signal));
        if let Err(e) = &result {
            log::error!("Scan loop failed: {}", e);
        }
        let report = self.teardown();
        Outcome { result, report }
    }

    /// Releases the session and closes the display. Consumes the context, so
    /// the session cannot be touched afterwards.
    pub fn teardown(self) -> TeardownReport {
        let ShutdownContext {
            mut session,
            mut sink,
        } = self;
        let mut report = TeardownReport::default();
        release_session(&mut session, &mut report);
        drop(session);
        sink.close();
        log::info!("Shutdown complete.");
        report
    }
}
