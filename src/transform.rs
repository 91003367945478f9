//! Polar to cartesian conversion of one rotation.

use crate::scan::{RawMeasurement, ScanBatch};

/// The USB cable of the A1 faces backwards on the mount. Half a turn puts
/// 0 degree to the front, opposite the cable.
const MOUNT_OFFSET_DEGREE: f64 = 180.;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointCartesian {
    /// Meters.
    pub x: f64,
    /// Meters.
    pub y: f64,
}

fn degree_to_radian(degree: f64) -> f64 {
    degree * std::f64::consts::PI / 180.
}

/// Zero distance or zero quality marks a saturated or missing return.
/// No upper range limit is applied.
pub fn is_valid(measurement: &RawMeasurement) -> bool {
    measurement.distance_mm != 0 && measurement.quality != 0
}

pub fn corrected_angle(angle_degree: f64) -> f64 {
    (angle_degree + MOUNT_OFFSET_DEGREE).rem_euclid(360.)
}

pub fn to_point(measurement: &RawMeasurement) -> PointCartesian {
    let theta = degree_to_radian(corrected_angle(measurement.angle_degree));
    let r = (measurement.distance_mm as f64) / 1000.;
    PointCartesian {
        x: r * f64::cos(theta),
        y: r * f64::sin(theta),
    }
}

/// Converts the valid measurements of `batch` into points.
pub fn transform(batch: &ScanBatch) -> Vec<PointCartesian> {
    batch
        .measurements
        .iter()
        .filter(|m| is_valid(m))
        .map(to_point)
        .collect()
}

/// The point set currently on screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameBuffer {
    points: Vec<PointCartesian>,
}

impl FrameBuffer {
    pub fn new() -> FrameBuffer {
        FrameBuffer::default()
    }

    /// Replaces the whole content. Nothing of the previous frame is kept.
    pub fn replace(&mut self, points: Vec<PointCartesian>) {
        self.points = points;
    }

    pub fn points(&self) -> &[PointCartesian] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
