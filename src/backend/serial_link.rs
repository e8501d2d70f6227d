//! Serial port link backed by the `serialport` crate
//!
//! Reads arrive in timeout-bounded chunks; bytes past the last complete
//! line stay buffered so a slow sender never loses a partial line to a
//! timeout.

use crate::backend::link::{PortInfo, RawLine, SerialLink};
use crate::error::LinkError;
use std::io::Read;
use std::time::{Duration, Instant};

/// Chunk size for a single OS read
const READ_CHUNK: usize = 256;

struct Connection {
    port_name: String,
    port: Box<dyn serialport::SerialPort>,
}

/// [`SerialLink`] implementation over a real OS serial port
pub struct SerialPortLink {
    baud_rate: u32,
    read_timeout: Duration,
    conn: Option<Connection>,
    /// Bytes read past the last complete line
    pending: Vec<u8>,
}

impl SerialPortLink {
    pub fn new(baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            baud_rate,
            read_timeout,
            conn: None,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }
}

impl SerialLink for SerialPortLink {
    fn open(&mut self, port: &str) -> Result<(), LinkError> {
        if let Some(conn) = &self.conn {
            if conn.port_name == port {
                return Ok(());
            }
        }
        self.close();

        match serialport::new(port, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
        {
            Ok(handle) => {
                tracing::info!("Opened {} at {} baud", port, self.baud_rate);
                self.conn = Some(Connection {
                    port_name: port.to_string(),
                    port: handle,
                });
                Ok(())
            }
            Err(e) => Err(LinkError::Unavailable(format!("{}: {}", port, e))),
        }
    }

    fn close(&mut self) {
        // Dropping the handle releases the OS port
        if let Some(conn) = self.conn.take() {
            tracing::info!("Closed {}", conn.port_name);
        }
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn open_port(&self) -> Option<&str> {
        self.conn.as_ref().map(|c| c.port_name.as_str())
    }

    fn read_line(&mut self) -> Result<RawLine, LinkError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| LinkError::Disconnected("no open port".to_string()))?;

        // A line may already be buffered from the previous read
        if let Some(line) = take_line(&mut self.pending) {
            return Ok(line);
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match conn.port.read(&mut buf) {
                Ok(0) => return Err(LinkError::Disconnected("end of stream".to_string())),
                Ok(n) => {
                    self.pending.extend_from_slice(&buf[..n]);
                    if let Some(line) = take_line(&mut self.pending) {
                        return Ok(line);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(LinkError::Disconnected(e.to_string())),
            }
            if Instant::now() >= deadline {
                return Err(LinkError::Timeout);
            }
        }
    }
}

/// Split the first complete line off `pending`, stripping the `\n`
/// delimiter and any trailing `\r`
fn take_line(pending: &mut Vec<u8>) -> Option<RawLine> {
    let idx = pending.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = pending.drain(..=idx).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// List available serial ports
///
/// On macOS, filters out `/dev/tty.*` devices and only shows `/dev/cu.*`
/// devices; the cu (calling unit) devices are non-blocking and preferred
/// for outgoing connections.
pub fn list_ports() -> Vec<PortInfo> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            return Vec::new();
        }
    };

    ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => ("USB".to_string(), info.product),
                serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None),
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None),
                serialport::SerialPortType::Unknown => ("Unknown".to_string(), None),
            };
            PortInfo {
                name: p.port_name,
                port_type,
                product,
            }
        })
        .collect()
}
