//! Mock link implementation for testing
//!
//! This module provides a mock serial link that can be used for testing
//! the acquisition pipeline without real hardware. It plays back a
//! scripted sequence of reads, or generates an endless stream of valid
//! snapshot lines.
//!
//! # Script items
//!
//! - [`MockRead::Line`] - A complete line, delimiter already stripped
//! - [`MockRead::Timeout`] - One read timeout
//! - [`MockRead::Disconnect`] - A mid-session link loss
//!
//! An exhausted script keeps returning timeouts, which is what an idle
//! device looks like to the loop.
//!
//! # Enabling
//!
//! Compiled for unit tests, and for the binary when the `mock-link`
//! feature is enabled:
//!
//! ```bash
//! cargo run --features mock-link
//! ```

use crate::backend::link::{PortInfo, RawLine, SerialLink};
use crate::error::LinkError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Port name the mock link answers to
pub const MOCK_PORT: &str = "mock0";

/// One scripted read result
#[derive(Debug, Clone)]
pub enum MockRead {
    /// A complete line as the link would return it
    Line(String),
    /// No complete line within the read timeout
    Timeout,
    /// The device went away
    Disconnect,
}

/// Observable open/close history, for asserting port lifecycle ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockLinkEvent {
    Opened(String),
    Closed(String),
}

/// [`SerialLink`] implementation for tests and hardware-free runs
pub struct MockLink {
    script: Arc<Mutex<VecDeque<MockRead>>>,
    events: Arc<Mutex<Vec<MockLinkEvent>>>,
    open: Option<String>,
    fail_open: bool,
    /// When set, reads synthesize valid snapshot lines at this period
    generator_period: Option<Duration>,
    generator_counter: u64,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            events: Arc::new(Mutex::new(Vec::new())),
            open: None,
            fail_open: false,
            generator_period: None,
            generator_counter: 0,
        }
    }

    /// Queue scripted reads
    pub fn with_reads(self, reads: impl IntoIterator<Item = MockRead>) -> Self {
        lock(&self.script).extend(reads);
        self
    }

    /// Make every `open` fail with [`LinkError::Unavailable`]
    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// A link that synthesizes one valid snapshot line per `period`,
    /// for running the application without hardware
    pub fn frame_generator(period: Duration) -> Self {
        let mut link = Self::new();
        link.generator_period = Some(period);
        link
    }

    /// Handle for feeding the script while the link is owned by the worker
    pub fn script_handle(&self) -> Arc<Mutex<VecDeque<MockRead>>> {
        self.script.clone()
    }

    /// Handle for observing open/close ordering
    pub fn events_handle(&self) -> Arc<Mutex<Vec<MockLinkEvent>>> {
        self.events.clone()
    }

    fn synthesize_line(&mut self) -> String {
        let n = self.generator_counter;
        self.generator_counter = self.generator_counter.wrapping_add(1);
        format!(
            concat!(
                "{{\"registers\":{{\"a\":{},\"p\":{},\"pc\":{},\"s\":{},\"x\":{},\"y\":{}}},",
                "\"stack\":{{\"value\":\"PUSH {}\"}},",
                "\"instructions\":{{\"value\":\"LDA #{}\"}}}}"
            ),
            n % 256,
            0,
            0x0600 + (n % 256),
            255 - (n % 128),
            (n * 3) % 256,
            (n * 7) % 256,
            n % 256,
            n % 256,
        )
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLink for MockLink {
    fn open(&mut self, port: &str) -> Result<(), LinkError> {
        if self.fail_open {
            return Err(LinkError::Unavailable(format!("{}: claimed elsewhere", port)));
        }
        if self.open.as_deref() == Some(port) {
            return Ok(());
        }
        self.close();
        self.open = Some(port.to_string());
        lock(&self.events).push(MockLinkEvent::Opened(port.to_string()));
        Ok(())
    }

    fn close(&mut self) {
        if let Some(port) = self.open.take() {
            lock(&self.events).push(MockLinkEvent::Closed(port));
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn open_port(&self) -> Option<&str> {
        self.open.as_deref()
    }

    fn read_line(&mut self) -> Result<RawLine, LinkError> {
        if self.open.is_none() {
            return Err(LinkError::Disconnected("no open port".to_string()));
        }
        if let Some(period) = self.generator_period {
            std::thread::sleep(period);
            let line = self.synthesize_line();
            return Ok(line.into_bytes());
        }
        match lock(&self.script).pop_front() {
            Some(MockRead::Line(line)) => Ok(line.into_bytes()),
            Some(MockRead::Timeout) | None => {
                // a real timeout takes time; keep spinning tests honest
                std::thread::sleep(Duration::from_millis(1));
                Err(LinkError::Timeout)
            }
            Some(MockRead::Disconnect) => {
                Err(LinkError::Disconnected("device removed".to_string()))
            }
        }
    }
}

/// A poisoned lock only means another holder panicked mid-test; the data
/// itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The mock entry appended to the port list when `mock-link` is enabled
pub fn mock_port_info() -> PortInfo {
    PortInfo {
        name: MOCK_PORT.to_string(),
        port_type: "Mock".to_string(),
        product: Some("Simulated target".to_string()),
    }
}
