//! SerialLink trait for a unified link interface
//!
//! This module provides a common trait for all serial link implementations,
//! enabling both real hardware ports (via the `serialport` crate) and mock
//! links for testing.

use crate::error::LinkError;

/// A byte sequence as read off the wire, delimiter stripped
pub type RawLine = Vec<u8>;

/// Unified interface for the physical serial connection
///
/// Implementations own at most one OS handle at a time and must be `Send`
/// so the acquisition loop can carry them onto its thread. The link knows
/// nothing about framing or parsing beyond the line delimiter.
pub trait SerialLink: Send {
    /// Open `port`, releasing any other port first
    ///
    /// An idempotent no-op when `port` is already the open port. Fails with
    /// [`LinkError::Unavailable`] when the OS port cannot be claimed.
    fn open(&mut self, port: &str) -> Result<(), LinkError>;

    /// Release the OS handle if open; safe to call when already closed
    fn close(&mut self);

    /// Whether a port is currently open
    fn is_open(&self) -> bool;

    /// Name of the currently open port, if any
    fn open_port(&self) -> Option<&str>;

    /// Block until a full line is available or the read timeout elapses
    ///
    /// Returns [`LinkError::Timeout`] when no complete line arrived in
    /// time (partial input is kept for the next call) and
    /// [`LinkError::Disconnected`] when the device went away.
    fn read_line(&mut self) -> Result<RawLine, LinkError>;
}

/// Information about an attachable serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Connectable identifier, e.g. `/dev/ttyUSB0` or `COM3`
    pub name: String,
    /// Transport kind: USB, Bluetooth, PCI, Unknown
    pub port_type: String,
    /// USB product string, when the OS reports one
    pub product: Option<String>,
}

impl PortInfo {
    /// Get a display-friendly label for this port
    pub fn display_name(&self) -> String {
        match &self.product {
            Some(product) => format!("{} ({})", self.name, product),
            None => format!("{} ({})", self.name, self.port_type),
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let port = PortInfo {
            name: "/dev/ttyUSB0".to_string(),
            port_type: "USB".to_string(),
            product: Some("FT232R USB UART".to_string()),
        };
        assert_eq!(port.display_name(), "/dev/ttyUSB0 (FT232R USB UART)");

        let port = PortInfo {
            name: "/dev/ttyS0".to_string(),
            port_type: "Unknown".to_string(),
            product: None,
        };
        assert_eq!(port.to_string(), "/dev/ttyS0 (Unknown)");
    }
}
