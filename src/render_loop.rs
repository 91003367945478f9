use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::session::{Pull, ScanStream};
use crate::shutdown::ShutdownSignal;
use crate::sink::{DisplaySink, SinkState};
use crate::transform::{self, FrameBuffer};

#[derive(Clone, Debug, PartialEq)]
pub struct LoopSettings {
    /// Time given to the display after each frame.
    pub pacing: Duration,
    /// Upper bound on the wait for one rotation. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        LoopSettings::from(&Config::default())
    }
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        LoopSettings {
            pacing: config.view.pause(),
            read_timeout: config.device.read_timeout(),
        }
    }
}

/// Why the loop returned without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    Interrupted,
    /// The device stopped producing rotations.
    Exhausted,
    WindowClosed,
}

/// Pulls rotations, converts them and hands them to the display.
pub struct RenderLoop {
    settings: LoopSettings,
    frame: FrameBuffer,
    n_frames: u64,
}

impl RenderLoop {
    pub fn new(settings: LoopSettings) -> RenderLoop {
        RenderLoop {
            settings,
            frame: FrameBuffer::new(),
            n_frames: 0,
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn n_frames(&self) -> u64 {
        self.n_frames
    }

    pub fn run<S: DisplaySink + ?Sized>(
        &mut self,
        stream: &ScanStream,
        sink: &mut S,
        signal: &ShutdownSignal,
    ) -> Result<LoopExit> {
        loop {
            if signal.is_triggered() {
                return Ok(LoopExit::Interrupted);
            }

            let batch = match stream.next_batch(signal.receiver(), self.settings.read_timeout)? {
                Pull::Batch(batch) => batch,
                Pull::Cancelled => return Ok(LoopExit::Interrupted),
                Pull::Exhausted => {
                    log::info!("No more scans after {} frames.", self.n_frames);
                    return Ok(LoopExit::Exhausted);
                }
            };

            self.frame.replace(transform::transform(&batch));
            log::trace!(
                "Frame {}: {} of {} measurements valid",
                self.n_frames,
                self.frame.len(),
                batch.len()
            );
            sink.show_points(&self.frame)?;
            self.n_frames += 1;

            if sink.pause(self.settings.pacing)? == SinkState::Closed {
                log::info!("Display closed by the operator.");
                return Ok(LoopExit::WindowClosed);
            }
        }
    }
}
