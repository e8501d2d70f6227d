//! # Serial Debug Monitor
//!
//! A host-side debugging front-end for microcontroller targets that report
//! their state over a serial link. The target sends periodic snapshots
//! (CPU registers, stack entries, recent instructions) as line-delimited
//! JSON; this tool acquires them on a background thread and renders them
//! live for the operator.
//!
//! ## Architecture
//!
//! - **Backend**: Owns the serial link and runs the acquisition state
//!   machine on a dedicated thread
//! - **Delivery queue**: A single-producer/single-consumer crossbeam
//!   channel carrying decoded frames, drained without blocking
//! - **Consumer**: Reconciles drained frames into display state on the
//!   presentation thread's tick
//! - **Frontend**: Renders the reconciled snapshots with eframe/egui
//!
//! ## Configuration
//!
//! A `config.toml` in the platform-appropriate data directory under
//! `serialdbg-rs`:
//!
//! - **Linux**: `~/.local/share/serialdbg-rs/`
//! - **macOS**: `~/Library/Application Support/serialdbg-rs/`
//! - **Windows**: `%APPDATA%\serialdbg-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use serialdbg_rs::{
//!     backend::{AcquisitionBackend, SerialPortLink},
//!     config::AppConfig,
//!     frontend::DebuggerApp,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let link = Box::new(SerialPortLink::new(
//!         config.link.baud_rate,
//!         config.link.read_timeout(),
//!     ));
//!
//!     let (backend, frontend) = AcquisitionBackend::new(&config, link);
//!     let running = backend.stop_handle();
//!     let worker = std::thread::spawn(move || backend.run());
//!
//!     let result = eframe::run_native(
//!         "Serial Debug Monitor",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| Ok(Box::new(DebuggerApp::new(cc, frontend, &config)))),
//!     );
//!
//!     running.store(false, std::sync::atomic::Ordering::SeqCst);
//!     let _ = worker.join();
//!     result
//! }
//! ```

pub mod backend;
pub mod config;
pub mod consumer;
pub mod error;
pub mod frontend;
pub mod types;

// Re-export commonly used types
pub use backend::{AcquisitionBackend, AcquisitionControl, FrontendLink, StatusEvent};
pub use config::AppConfig;
pub use consumer::FrameConsumer;
pub use error::{DecodeError, LinkError, MonitorError, Result};
pub use frontend::DebuggerApp;
pub use types::{Frame, Register, RegisterFile};
