//! Viewer configuration, loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration for an RPLIDAR A1 on `/dev/ttyUSB0`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub view: ViewConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port the LiDAR is attached to.
    pub port: String,
    pub baud_rate: u32,
    /// Time the device is given to answer while connecting.
    pub timeout_secs: u64,
    /// Input backlog, in measurements, above which pending bytes are discarded.
    pub max_buffered_measurements: usize,
    /// Rotations with this many measurements or fewer are dropped.
    pub min_scan_len: usize,
    /// Upper bound on the wait for one rotation. Unbounded when absent.
    pub read_timeout_ms: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            timeout_secs: 3,
            max_buffered_measurements: 2000,
            min_scan_len: 5,
            read_timeout_ms: None,
        }
    }
}

impl DeviceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub title: String,
    /// Side of the square window in pixels.
    pub window_size: u32,
    /// Half width of the plotted area in meters. Nominal range of the A1M8.
    pub range_m: f64,
    pub point_size: u32,
    /// Time handed to the window between two frames.
    pub pause_ms: u64,
    pub max_fps: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            title: "LIDAR A1M8".to_string(),
            window_size: 800,
            range_m: 12.,
            point_size: 2,
            pause_ms: 50,
            max_fps: 60,
        }
    }
}

impl ViewConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter for env_logger. `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Config::parse(&contents)
    }
}
