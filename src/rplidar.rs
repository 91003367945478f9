//! Serial session with an RPLIDAR A1 class range finder.

use std::collections::VecDeque;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use serialport::SerialPort;

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::protocol::{self, type_code, DeviceHealth, DeviceInfo, HealthStatus, SendMode};
use crate::scan::{self, ScanAssembler, ScanBatch};
use crate::serial;
use crate::session::{DeviceSession, ScanStream, SessionState};

const MEASUREMENT_SIZE: usize = protocol::MEASUREMENT_SIZE as usize;
const SCAN_CHANNEL_CAPACITY: usize = 10;
const READ_POLL_MS: u64 = 5;
const STOP_SETTLE_MS: u64 = 10;

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub baud_rate: u32,
    /// Deadline for every request/response exchange.
    pub timeout: Duration,
    pub max_buffered_measurements: usize,
    pub min_scan_len: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings::from(&DeviceConfig::default())
    }
}

impl From<&DeviceConfig> for SessionSettings {
    fn from(config: &DeviceConfig) -> Self {
        SessionSettings {
            baud_rate: config.baud_rate,
            timeout: config.timeout(),
            max_buffered_measurements: config.max_buffered_measurements,
            min_scan_len: config.min_scan_len,
        }
    }
}

struct ReaderThread {
    terminator_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl ReaderThread {
    fn join(self) {
        let _ = self.terminator_tx.try_send(());
        if self.handle.join().is_err() {
            log::error!("Scan reader thread panicked");
        }
    }
}

pub struct RplidarSession {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    state: SessionState,
    settings: SessionSettings,
    info: Option<DeviceInfo>,
    reader: Option<ReaderThread>,
}

impl RplidarSession {
    /// Opens `port_name` and waits at most `timeout` for the device to answer.
    pub fn connect(port_name: &str, timeout: Duration) -> Result<RplidarSession> {
        let settings = SessionSettings {
            timeout,
            ..SessionSettings::default()
        };
        RplidarSession::connect_with(port_name, settings)
    }

    pub fn connect_with(port_name: &str, settings: SessionSettings) -> Result<RplidarSession> {
        log::info!("Connecting to the LiDAR on {}...", port_name);
        let port = serialport::new(port_name, settings.baud_rate)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| Error::connection(port_name, e))?;

        let mut session = RplidarSession {
            port_name: port_name.to_string(),
            port: Some(port),
            state: SessionState::Created,
            settings,
            info: None,
            reader: None,
        };
        if let Err(e) = session.handshake() {
            return Err(Error::connection(port_name, e));
        }
        log::info!("LiDAR ready.");
        Ok(session)
    }

    fn handshake(&mut self) -> Result<()> {
        self.stop()?;
        let timeout = self.settings.timeout;
        let port = self.port_mut()?;

        let info = request_info(port, timeout)?;
        log::info!(
            "Model {}, firmware {}.{}, hardware {}, serial number {}",
            info.model,
            info.firmware_major_version,
            info.firmware_minor_version,
            info.hardware_version,
            info.serial_number_string()
        );

        let health = request_health(port, timeout)?;
        match health.status {
            HealthStatus::Good => {}
            HealthStatus::Warning => {
                log::warn!("Device health warning. Error code = {:#06X}", health.error_code)
            }
            HealthStatus::Error => {
                return Err(Error::Protocol(format!(
                    "Device health error. Error code = {:#06X}.",
                    health.error_code
                )));
            }
        }

        set_motor(port, true);
        self.info = Some(info);
        Ok(())
    }

    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(Error::Disconnected)
    }
}

impl DeviceSession for RplidarSession {
    fn scans(&mut self) -> Result<ScanStream> {
        match self.state {
            SessionState::Disconnected => return Err(Error::Disconnected),
            SessionState::Scanning | SessionState::Stopped => {
                return Err(Error::ScanAlreadyStarted)
            }
            SessionState::Created | SessionState::Ready => {}
        }

        let timeout = self.settings.timeout;
        let port = self.port_mut()?;
        start_scan(port, timeout)?;
        let reader_port = port.try_clone()?;

        let (terminator_tx, terminator_rx) = bounded(1);
        let (scan_tx, scan_rx) = bounded(SCAN_CHANNEL_CAPACITY);
        let settings = self.settings.clone();
        let handle = std::thread::Builder::new()
            .name("rplidar-reader".to_string())
            .spawn(move || {
                read_scans(reader_port, settings, scan_tx, terminator_rx);
            })?;

        self.reader = Some(ReaderThread {
            terminator_tx,
            handle,
        });
        self.state = SessionState::Scanning;
        log::debug!("Scanning started on {}", self.port_name);
        Ok(ScanStream::new(scan_rx))
    }

    fn stop(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        if let Some(reader) = self.reader.take() {
            reader.join();
        }

        // a failed STOP still leaves the scan abandoned
        self.state = match self.state {
            SessionState::Created | SessionState::Ready => SessionState::Ready,
            _ => SessionState::Stopped,
        };
        let port = self.port_mut()?;
        halt_scan(port)
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        if self.state == SessionState::Scanning {
            log::warn!("Disconnecting while scanning. Stopping the scan first.");
            if let Err(e) = self.stop() {
                log::warn!("Failed to stop the scan: {}", e);
            }
        }
        if let Some(reader) = self.reader.take() {
            reader.join();
        }
        if let Some(mut port) = self.port.take() {
            set_motor(&mut port, false);
        }
        self.state = SessionState::Disconnected;
        log::debug!("Disconnected from {}", self.port_name);
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

impl Drop for RplidarSession {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            log::warn!("Failed to disconnect from {}: {}", self.port_name, e);
        }
    }
}

fn start_scan(port: &mut Box<dyn SerialPort>, timeout: Duration) -> Result<()> {
    serial::send_command(port, protocol::SCAN)?;
    let descriptor = serial::read(port, protocol::DESCRIPTOR_SIZE, timeout)?;
    protocol::validate_response_descriptor(
        &descriptor,
        protocol::MEASUREMENT_SIZE,
        SendMode::Multiple,
        type_code::MEASUREMENT,
    )
}

fn halt_scan(port: &mut Box<dyn SerialPort>) -> Result<()> {
    serial::send_command(port, protocol::STOP)?;
    serial::sleep_ms(STOP_SETTLE_MS);
    serial::flush(port)
}

fn request_info(port: &mut Box<dyn SerialPort>, timeout: Duration) -> Result<DeviceInfo> {
    serial::send_command(port, protocol::GET_INFO)?;
    let descriptor = serial::read(port, protocol::DESCRIPTOR_SIZE, timeout)?;
    protocol::validate_response_descriptor(
        &descriptor,
        protocol::INFO_SIZE,
        SendMode::Single,
        type_code::INFO,
    )?;
    let data = serial::read(port, protocol::INFO_SIZE as usize, timeout)?;
    DeviceInfo::parse(&data)
}

fn request_health(port: &mut Box<dyn SerialPort>, timeout: Duration) -> Result<DeviceHealth> {
    serial::send_command(port, protocol::GET_HEALTH)?;
    let descriptor = serial::read(port, protocol::DESCRIPTOR_SIZE, timeout)?;
    protocol::validate_response_descriptor(
        &descriptor,
        protocol::HEALTH_SIZE,
        SendMode::Single,
        type_code::HEALTH,
    )?;
    let data = serial::read(port, protocol::HEALTH_SIZE as usize, timeout)?;
    DeviceHealth::parse(&data)
}

// The A1 motor runs while DTR is cleared.
fn set_motor(port: &mut Box<dyn SerialPort>, running: bool) {
    if let Err(e) = port.write_data_terminal_ready(!running) {
        log::warn!("Failed to switch the motor {}: {}", if running { "on" } else { "off" }, e);
    }
}

fn do_terminate(terminator_rx: &Receiver<()>) -> bool {
    terminator_rx.try_recv().is_ok()
}

struct ReaderState {
    buffer: VecDeque<u8>,
    assembler: ScanAssembler,
}

fn read_available(
    port: &mut Box<dyn SerialPort>,
    settings: &SessionSettings,
    state: &mut ReaderState,
) -> Result<Vec<ScanBatch>> {
    let n_read = serial::get_n_read(port)?;
    let limit = settings.max_buffered_measurements * MEASUREMENT_SIZE;
    if n_read > limit {
        log::warn!(
            "Too many bytes in the input buffer: {}/{}. Cleaning...",
            n_read,
            limit
        );
        // Restarting puts the stream back on a measurement boundary.
        halt_scan(port)?;
        start_scan(port, settings.timeout)?;
        state.buffer.clear();
        state.assembler = ScanAssembler::new(settings.min_scan_len);
        return Ok(Vec::new());
    }
    if n_read == 0 {
        serial::sleep_ms(READ_POLL_MS);
        return Ok(Vec::new());
    }

    let signal = serial::read(port, n_read, settings.timeout)?;
    state.buffer.extend(signal);

    let mut batches = Vec::new();
    while state.buffer.len() >= MEASUREMENT_SIZE {
        let raw = state.buffer.drain(..MEASUREMENT_SIZE).collect::<Vec<_>>();
        let measurement = scan::decode_measurement(&raw)?;
        if let Some(batch) = state.assembler.push(measurement) {
            batches.push(batch);
        }
    }
    Ok(batches)
}

fn forward(
    scan_tx: &Sender<Result<ScanBatch>>,
    message: Result<ScanBatch>,
    terminator_rx: &Receiver<()>,
) -> bool {
    select! {
        send(scan_tx, message) -> result => result.is_ok(),
        recv(terminator_rx) -> _ => false,
    }
}

fn read_scans(
    mut port: Box<dyn SerialPort>,
    settings: SessionSettings,
    scan_tx: Sender<Result<ScanBatch>>,
    terminator_rx: Receiver<()>,
) {
    let mut state = ReaderState {
        buffer: VecDeque::new(),
        assembler: ScanAssembler::new(settings.min_scan_len),
    };
    loop {
        if do_terminate(&terminator_rx) {
            return;
        }
        match read_available(&mut port, &settings, &mut state) {
            Ok(batches) => {
                for batch in batches {
                    if !forward(&scan_tx, Ok(batch), &terminator_rx) {
                        return;
                    }
                }
            }
            Err(e) => {
                log::error!("Failed to read scan data: {}", e);
                forward(&scan_tx, Err(e), &terminator_rx);
                return;
            }
        }
    }
}
