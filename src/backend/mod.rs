//! Backend module for serial acquisition
//!
//! This module handles all serial communication in a separate thread to
//! keep the UI responsive. It uses crossbeam channels for thread-safe
//! communication with the frontend.
//!
//! # Architecture
//!
//! The backend runs in a separate thread from the UI, communicating
//! through two one-way channels plus one shared control handle:
//!
//! - [`AcquisitionControl`] - Operator intent (start/stop, selected port),
//!   written by the UI and polled by the acquisition loop
//! - [`queue::FrameSender`] / [`queue::FrameReceiver`] - The delivery
//!   queue; the only channel carrying frames
//! - [`StatusEvent`] - Link status, surfaced errors, and periodic stats
//!   for the status bar
//!
//! # Components
//!
//! - [`SerialLink`] - Low-level link interface with real ([`SerialPortLink`])
//!   and mock ([`mock_link::MockLink`], feature-gated) implementations
//! - [`decoder`] - Turns raw lines into frames
//! - [`AcquisitionWorker`] - The state-machine loop that owns the link
//! - [`AcquisitionBackend`] - Entry point that wires the channels and runs
//!   the worker
//!
//! # Example
//!
//! ```ignore
//! use serialdbg_rs::backend::AcquisitionBackend;
//! use serialdbg_rs::backend::SerialPortLink;
//! use serialdbg_rs::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let link = Box::new(SerialPortLink::new(
//!     config.link.baud_rate,
//!     config.link.read_timeout(),
//! ));
//! let (backend, frontend) = AcquisitionBackend::new(&config, link);
//!
//! std::thread::spawn(move || backend.run());
//!
//! frontend.control.select_port(Some("/dev/ttyUSB0".to_string()));
//! frontend.control.start();
//!
//! for frame in frontend.frames.drain_all() {
//!     // reconcile into display state
//! }
//! ```

pub mod acquisition;
pub mod decoder;
pub mod link;
#[cfg(any(test, feature = "mock-link"))]
pub mod mock_link;
pub mod queue;
pub mod serial_link;

pub use acquisition::{AcquisitionWorker, LoopState};
pub use link::{PortInfo, RawLine, SerialLink};
pub use queue::{frame_queue, FrameReceiver, FrameSender};
pub use serial_link::SerialPortLink;

#[cfg(any(test, feature = "mock-link"))]
pub use mock_link::{MockLink, MockLinkEvent, MockRead, MOCK_PORT};

use crate::config::AppConfig;
use crate::types::{AcquisitionStats, LinkStatus};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

/// Operator intent shared between the presentation layer and the
/// acquisition loop
///
/// Constructed once at startup and passed to both sides as an
/// `Arc<AcquisitionControl>`; nothing else writes it. Both fields live
/// under one mutex so a reader never observes a half-updated pair.
#[derive(Debug, Default)]
pub struct AcquisitionControl {
    inner: Mutex<ControlState>,
}

#[derive(Debug, Clone, Default)]
struct ControlState {
    enabled: bool,
    selected_port: Option<String>,
}

impl AcquisitionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable acquisition; idempotent
    pub fn start(&self) {
        self.lock().enabled = true;
    }

    /// Disable acquisition; idempotent
    pub fn stop(&self) {
        self.lock().enabled = false;
    }

    /// Change the selected port; the loop reconnects on its next cycle
    pub fn select_port(&self, port: Option<String>) {
        self.lock().selected_port = port;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn selected_port(&self) -> Option<String> {
        self.lock().selected_port.clone()
    }

    /// Read both fields under one lock
    pub fn snapshot(&self) -> (bool, Option<String>) {
        let state = self.lock();
        (state.enabled, state.selected_port.clone())
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // A poisoned lock only means a writer panicked; the pair itself
        // is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Status sent from the acquisition loop to the UI
///
/// Frames never travel here; they have their own queue.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    /// Link status changed
    Link(LinkStatus),
    /// A link open/read failure surfaced to the operator
    LinkError(String),
    /// Periodic statistics update
    Stats(AcquisitionStats),
    /// The worker is exiting
    Shutdown,
}

/// Presentation-side handles returned by [`AcquisitionBackend::new`]
pub struct FrontendLink {
    /// Consumer half of the delivery queue
    pub frames: FrameReceiver,
    /// Status events for the status bar
    pub events: Receiver<StatusEvent>,
    /// Shared operator intent
    pub control: Arc<AcquisitionControl>,
}

/// The acquisition backend that runs in a separate thread
pub struct AcquisitionBackend {
    config: AppConfig,
    link: Box<dyn SerialLink>,
    control: Arc<AcquisitionControl>,
    running: Arc<AtomicBool>,
    frames: FrameSender,
    events: Sender<StatusEvent>,
}

impl AcquisitionBackend {
    /// Create a new backend plus the presentation-side handles
    pub fn new(config: &AppConfig, link: Box<dyn SerialLink>) -> (Self, FrontendLink) {
        let (frame_tx, frame_rx) = frame_queue();
        let (event_tx, event_rx) = unbounded();
        let control = Arc::new(AcquisitionControl::new());

        let backend = Self {
            config: config.clone(),
            link,
            control: control.clone(),
            running: Arc::new(AtomicBool::new(true)),
            frames: frame_tx,
            events: event_tx,
        };

        let frontend = FrontendLink {
            frames: frame_rx,
            events: event_rx,
            control,
        };

        (backend, frontend)
    }

    /// Flag that stops [`run`](Self::run); stop latency is bounded by the
    /// link read timeout
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run the acquisition loop until the stop handle clears
    pub fn run(self) {
        let worker = AcquisitionWorker::new(
            &self.config,
            self.control,
            self.running,
            self.link,
            self.frames,
            self.events,
        );
        worker.run();
    }
}

/// List attachable ports: real serial ports, plus the simulated target
/// when the `mock-link` feature is enabled
pub fn list_ports() -> Vec<PortInfo> {
    #[allow(unused_mut)]
    let mut ports = serial_link::list_ports();

    #[cfg(feature = "mock-link")]
    ports.push(mock_link::mock_port_info());

    ports
}
