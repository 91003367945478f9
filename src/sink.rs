use std::time::Duration;

use crate::error::Result;
use crate::transform::FrameBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkState {
    Open,
    /// The operator closed the display.
    Closed,
}

/// Where frames are shown.
pub trait DisplaySink {
    fn show_points(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Gives the display `interval` to redraw and handle its own events.
    /// Must return after about `interval`.
    fn pause(&mut self, interval: Duration) -> Result<SinkState>;

    fn close(&mut self);
}
