//! Live cartesian view of an RPLIDAR A1 range finder.
//!
//! Rotations are pulled from a [`DeviceSession`], filtered and converted to
//! points in meters by [`transform()`], and drawn by a [`DisplaySink`] until
//! the operator interrupts the process.

pub mod config;
pub mod error;
pub mod protocol;
pub mod render_loop;
pub mod rplidar;
pub mod scan;
mod serial;
pub mod session;
pub mod shutdown;
pub mod sink;
pub mod transform;
pub mod viewer;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use render_loop::{LoopExit, LoopSettings, RenderLoop};
pub use rplidar::{RplidarSession, SessionSettings};
pub use scan::{RawMeasurement, ScanBatch};
pub use session::{DeviceSession, Pull, ScanStream, SessionState};
pub use shutdown::{ShutdownContext, ShutdownSignal};
pub use sink::{DisplaySink, SinkState};
pub use transform::{transform, FrameBuffer, PointCartesian};
pub use viewer::PlotWindow;
