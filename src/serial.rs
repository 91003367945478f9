use serialport::SerialPort;
use std::io;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::protocol;

const POLL_INTERVAL_MS: u64 = 10;

pub fn sleep_ms(duration: u64) {
    std::thread::sleep(Duration::from_millis(duration));
}

fn timeout_error(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, message)
}

pub fn send_command(port: &mut Box<dyn SerialPort>, command: u8) -> Result<()> {
    port.write_all(&protocol::request(command))?;
    port.flush()?;
    Ok(())
}

pub fn get_n_read(port: &mut Box<dyn SerialPort>) -> Result<usize> {
    let n_u32: u32 = port.bytes_to_read()?;
    Ok(n_u32 as usize)
}

/// Discards every byte waiting in the input buffer.
pub fn flush(port: &mut Box<dyn SerialPort>) -> Result<()> {
    let n_read: usize = get_n_read(port)?;
    if n_read == 0 {
        return Ok(());
    }
    let mut packet: Vec<u8> = vec![0; n_read];
    port.read_exact(packet.as_mut_slice())?;
    Ok(())
}

/// Reads exactly `data_size` bytes, waiting at most `timeout` for them to arrive.
pub fn read(port: &mut Box<dyn SerialPort>, data_size: usize, timeout: Duration) -> Result<Vec<u8>> {
    if data_size == 0 {
        return Ok(Vec::new());
    }
    let deadline = Instant::now() + timeout;
    loop {
        let n_read: usize = get_n_read(port)?;
        if n_read >= data_size {
            break;
        }
        if Instant::now() >= deadline {
            return Err(timeout_error("Operation timed out").into());
        }
        sleep_ms(POLL_INTERVAL_MS);
    }

    let mut packet: Vec<u8> = vec![0; data_size];
    port.read_exact(packet.as_mut_slice())?;
    Ok(packet)
}
