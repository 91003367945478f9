//! Request and response framing of the RPLIDAR serial protocol.

use crate::error::{Error, Result};

pub const SYNC_BYTE: u8 = 0xA5;
pub const DESCRIPTOR_SIZE: usize = 7;

pub const STOP: u8 = 0x25;
pub const SCAN: u8 = 0x20;
pub const GET_INFO: u8 = 0x50;
pub const GET_HEALTH: u8 = 0x52;

pub const INFO_SIZE: u32 = 20;
pub const HEALTH_SIZE: u32 = 3;
pub const MEASUREMENT_SIZE: u32 = 5;

pub mod type_code {
    pub const INFO: u8 = 0x04;
    pub const HEALTH: u8 = 0x06;
    pub const MEASUREMENT: u8 = 0x81;
}

/// How many responses follow a descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SendMode {
    Single,
    Multiple,
}

pub fn to_string(data: &[u8]) -> String {
    data.iter()
        .map(|e| format!("{:02X}", e))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn request(command: u8) -> [u8; 2] {
    [SYNC_BYTE, command]
}

fn send_mode(bits: u32) -> Result<SendMode> {
    match bits {
        0 => Ok(SendMode::Single),
        1 => Ok(SendMode::Multiple),
        _ => Err(Error::Protocol(format!("Unknown send mode {}.", bits))),
    }
}

/// Checks the descriptor that precedes every response.
pub fn validate_response_descriptor(
    descriptor: &[u8],
    response_length: u32,
    mode: SendMode,
    type_code: u8,
) -> Result<()> {
    if descriptor.len() != DESCRIPTOR_SIZE {
        return Err(Error::Protocol(format!(
            "Response descriptor must be always seven bytes. Actually {} bytes.",
            descriptor.len()
        )));
    }
    if descriptor[0] != SYNC_BYTE || descriptor[1] != 0x5A {
        return Err(Error::Protocol(format!(
            "Descriptor must start with 0xA55A. Observed = {}.",
            to_string(&descriptor[0..2])
        )));
    }
    let word = u32::from_le_bytes([descriptor[2], descriptor[3], descriptor[4], descriptor[5]]);
    let length = word & 0x3FFF_FFFF;
    if length != response_length {
        return Err(Error::Protocol(format!(
            "Expected response length of {} bytes but found {} bytes.",
            response_length, length
        )));
    }
    let observed_mode = send_mode(word >> 30)?;
    if observed_mode != mode {
        return Err(Error::Protocol(format!(
            "Expected send mode {:?} but obtained {:?}.",
            mode, observed_mode
        )));
    }
    if descriptor[6] != type_code {
        return Err(Error::Protocol(format!(
            "Expected type code {:#04X} but obtained {:#04X}.",
            type_code, descriptor[6]
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    pub model: u8,
    pub firmware_major_version: u8,
    pub firmware_minor_version: u8,
    pub hardware_version: u8,
    pub serial_number: [u8; 16],
}

impl DeviceInfo {
    pub fn parse(data: &[u8]) -> Result<DeviceInfo> {
        if data.len() != INFO_SIZE as usize {
            return Err(Error::Protocol(format!(
                "Device info must be {} bytes. Actually {} bytes.",
                INFO_SIZE,
                data.len()
            )));
        }
        let mut serial_number = [0u8; 16];
        serial_number.copy_from_slice(&data[4..20]);
        Ok(DeviceInfo {
            model: data[0],
            firmware_minor_version: data[1],
            firmware_major_version: data[2],
            hardware_version: data[3],
            serial_number,
        })
    }

    pub fn serial_number_string(&self) -> String {
        self.serial_number
            .iter()
            .map(|e| format!("{:02X}", e))
            .collect::<String>()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HealthStatus {
    Good,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceHealth {
    pub status: HealthStatus,
    pub error_code: u16,
}

impl DeviceHealth {
    pub fn parse(data: &[u8]) -> Result<DeviceHealth> {
        if data.len() != HEALTH_SIZE as usize {
            return Err(Error::Protocol(format!(
                "Device health must be {} bytes. Actually {} bytes.",
                HEALTH_SIZE,
                data.len()
            )));
        }
        let status = match data[0] {
            0 => HealthStatus::Good,
            1 => HealthStatus::Warning,
            2 => HealthStatus::Error,
            s => {
                return Err(Error::Protocol(format!("Unknown health status {}.", s)));
            }
        };
        Ok(DeviceHealth {
            status,
            error_code: u16::from_le_bytes([data[1], data[2]]),
        })
    }
}
