use crate::error::{Error, Result};
use crate::protocol;

const MEASUREMENT_SIZE: usize = protocol::MEASUREMENT_SIZE as usize;

/// One reading as reported by the device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawMeasurement {
    /// Signal quality. Zero marks an invalid reading.
    pub quality: u8,
    /// Angle in degree, in [0, 360).
    pub angle_degree: f64,
    /// Distance to an object in millimeters. Zero when nothing was hit.
    pub distance_mm: u16,
    /// Set on the first measurement of a rotation.
    pub new_scan: bool,
}

impl RawMeasurement {
    pub fn new(quality: u8, angle_degree: f64, distance_mm: u16) -> RawMeasurement {
        RawMeasurement {
            quality,
            angle_degree,
            distance_mm,
            new_scan: false,
        }
    }
}

/// Struct to hold one lap of lidar scan data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanBatch {
    pub measurements: Vec<RawMeasurement>,
}

impl ScanBatch {
    pub fn new(measurements: Vec<RawMeasurement>) -> ScanBatch {
        ScanBatch { measurements }
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

fn to_angle(byte1: u8, byte2: u8) -> f64 {
    let q6 = ((byte1 as u16) >> 1) + ((byte2 as u16) << 7);
    (q6 as f64) / 64.
}

fn to_distance(byte3: u8, byte4: u8) -> u16 {
    let q2 = (byte3 as u16) + ((byte4 as u16) << 8);
    q2 / 4
}

/// Decodes one 5-byte measurement of the scan response.
pub fn decode_measurement(raw: &[u8]) -> Result<RawMeasurement> {
    if raw.len() != MEASUREMENT_SIZE {
        return Err(Error::Protocol(format!(
            "Measurement must be {} bytes. Actually {} bytes.",
            MEASUREMENT_SIZE,
            raw.len()
        )));
    }
    let new_scan = raw[0] & 0x01 == 1;
    let inversed_new_scan = (raw[0] >> 1) & 0x01 == 1;
    if new_scan == inversed_new_scan {
        return Err(Error::Protocol(format!(
            "New scan flags mismatch in {}.",
            protocol::to_string(raw)
        )));
    }
    if raw[1] & 0x01 != 1 {
        return Err(Error::Protocol(format!(
            "Check bit not equal to 1 in {}.",
            protocol::to_string(raw)
        )));
    }
    Ok(RawMeasurement {
        quality: raw[0] >> 2,
        angle_degree: to_angle(raw[1], raw[2]),
        distance_mm: to_distance(raw[3], raw[4]),
        new_scan,
    })
}

/// Groups the measurement stream into rotations.
pub struct ScanAssembler {
    current: Vec<RawMeasurement>,
    min_len: usize,
}

impl ScanAssembler {
    pub fn new(min_len: usize) -> ScanAssembler {
        ScanAssembler {
            current: Vec::new(),
            min_len,
        }
    }

    /// Returns the finished rotation when `measurement` starts a new one.
    /// Rotations with `min_len` or fewer non-zero distances are dropped.
    pub fn push(&mut self, measurement: RawMeasurement) -> Option<ScanBatch> {
        let mut finished = None;
        if measurement.new_scan {
            let lap = std::mem::take(&mut self.current);
            let n_ranged = lap.iter().filter(|m| m.distance_mm > 0).count();
            if n_ranged > self.min_len {
                finished = Some(ScanBatch::new(lap));
            }
        }
        self.current.push(measurement);
        finished
    }
}

#[cfg(test)]
pub(crate) fn encode_measurement(
    quality: u8,
    angle_degree: f64,
    distance_mm: u16,
    new_scan: bool,
) -> [u8; 5] {
    let s = new_scan as u8;
    let q6 = (angle_degree * 64.).round() as u16;
    let q2 = distance_mm * 4;
    [
        (quality << 2) | ((1 - s) << 1) | s,
        (((q6 & 0x7F) as u8) << 1) | 0x01,
        (q6 >> 7) as u8,
        (q2 & 0xFF) as u8,
        (q2 >> 8) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_measurement() {
        // quality 15, start of a rotation, 90 degree, 1000 mm
        let m = decode_measurement(&[0x3D, 0x01, 0x2D, 0xA0, 0x0F]).unwrap();
        assert_eq!(m.quality, 15);
        assert!(m.new_scan);
        assert!(f64::abs(m.angle_degree - 90.) < 1e-8);
        assert_eq!(m.distance_mm, 1000);

        // quality 10, 0.5 degree, 1.75 mm is truncated to 1 mm
        let m = decode_measurement(&[0x2A, 0x41, 0x00, 0x07, 0x00]).unwrap();
        assert_eq!(m.quality, 10);
        assert!(!m.new_scan);
        assert!(f64::abs(m.angle_degree - 0.5) < 1e-8);
        assert_eq!(m.distance_mm, 1);
    }

    #[test]
    fn test_decode_measurement_flags() {
        let result = decode_measurement(&[0x3F, 0x01, 0x2D, 0xA0, 0x0F]);
        match result {
            Err(Error::Protocol(m)) => {
                assert_eq!(m, "New scan flags mismatch in 3F 01 2D A0 0F.")
            }
            _ => panic!("flags S and !S are both set"),
        }

        let result = decode_measurement(&[0x3D, 0x00, 0x2D, 0xA0, 0x0F]);
        match result {
            Err(Error::Protocol(m)) => {
                assert_eq!(m, "Check bit not equal to 1 in 3D 00 2D A0 0F.")
            }
            _ => panic!("check bit is cleared"),
        }

        assert!(decode_measurement(&[0x3D, 0x01, 0x2D, 0xA0]).is_err());
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        assert_eq!(
            encode_measurement(15, 90., 1000, true),
            [0x3D, 0x01, 0x2D, 0xA0, 0x0F]
        );
    }

    #[test]
    fn test_scan_assembler() {
        let mut assembler = ScanAssembler::new(2);

        // measurements before the first start flag form an incomplete lap
        assert_eq!(assembler.push(RawMeasurement::new(3, 350., 100)), None);

        let mut first = RawMeasurement::new(10, 0., 500);
        first.new_scan = true;
        assert_eq!(assembler.push(first), None);
        for i in 1..4 {
            let m = RawMeasurement::new(10, (i as f64) * 90., 500);
            assert_eq!(assembler.push(m), None);
        }

        let mut second = RawMeasurement::new(12, 0.2, 600);
        second.new_scan = true;
        let lap = assembler.push(second).unwrap();
        assert_eq!(lap.len(), 4);
        assert_eq!(lap.measurements[0], first);
        assert!(f64::abs(lap.measurements[3].angle_degree - 270.) < 1e-8);

        // a lap of two measurements is too short
        assert_eq!(assembler.push(RawMeasurement::new(12, 10., 600)), None);
        let mut third = RawMeasurement::new(12, 0.1, 600);
        third.new_scan = true;
        assert_eq!(assembler.push(third), None);
    }

    #[test]
    fn test_scan_assembler_ignores_empty_readings() {
        let mut assembler = ScanAssembler::new(2);

        let mut first = RawMeasurement::new(10, 0., 500);
        first.new_scan = true;
        assembler.push(first);
        for i in 1..6 {
            assembler.push(RawMeasurement::new(0, (i as f64) * 60., 0));
        }
        // six readings but only one with a distance
        let mut second = RawMeasurement::new(10, 0.3, 700);
        second.new_scan = true;
        assert_eq!(assembler.push(second), None);

        assembler.push(RawMeasurement::new(10, 90., 0));
        assembler.push(RawMeasurement::new(10, 180., 800));
        assembler.push(RawMeasurement::new(10, 270., 900));
        let mut third = RawMeasurement::new(10, 0.1, 600);
        third.new_scan = true;
        let lap = assembler.push(third).unwrap();
        // empty readings stay in the rotation, the filter drops them later
        assert_eq!(lap.len(), 4);
        assert_eq!(lap.measurements[1].distance_mm, 0);
    }
}
