//! Core data types for the Serial Debug Monitor
//!
//! This module contains the fundamental data structures used throughout
//! the application for representing decoded device snapshots and the
//! derived state shown to the operator.
//!
//! # Main Types
//!
//! - [`Register`] - The fixed register set reported by the target
//! - [`Frame`] - One decoded device state snapshot (registers + stack + instruction entries)
//! - [`RegisterValue`] - Current and previous value of a single register
//! - [`LinkStatus`] / [`AcquisitionStats`] - Operator-visible acquisition health

use serde::{Deserialize, Serialize};

/// A CPU register reported by the target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    /// Accumulator
    A,
    /// Processor status
    P,
    /// Program counter
    Pc,
    /// Stack pointer
    S,
    /// X index
    X,
    /// Y index
    Y,
}

impl Register {
    /// Every register a frame carries, in display order
    pub const ALL: [Register; 6] = [
        Register::A,
        Register::P,
        Register::Pc,
        Register::S,
        Register::X,
        Register::Y,
    ];

    /// Wire name of the register
    pub fn name(&self) -> &'static str {
        match self {
            Register::A => "a",
            Register::P => "p",
            Register::Pc => "pc",
            Register::S => "s",
            Register::X => "x",
            Register::Y => "y",
        }
    }

    /// Label shown in the register table
    pub fn label(&self) -> &'static str {
        match self {
            Register::A => "A:",
            Register::P => "P:",
            Register::Pc => "PC:",
            Register::S => "S:",
            Register::X => "X:",
            Register::Y => "Y:",
        }
    }

    /// Stable position of this register in [`Register::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Register::A => 0,
            Register::P => 1,
            Register::Pc => 2,
            Register::S => 3,
            Register::X => 4,
            Register::Y => 5,
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The register values carried by one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    pub a: i64,
    pub p: i64,
    pub pc: i64,
    pub s: i64,
    pub x: i64,
    pub y: i64,
}

impl RegisterFile {
    /// Value of a single register
    pub fn get(&self, reg: Register) -> i64 {
        match reg {
            Register::A => self.a,
            Register::P => self.p,
            Register::Pc => self.pc,
            Register::S => self.s,
            Register::X => self.x,
            Register::Y => self.y,
        }
    }
}

/// One entry appended to a display history sequence (stack or instructions)
///
/// The wire format leaves `value` open, so anything JSON can carry is kept
/// as-is until display time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: serde_json::Value,
}

impl HistoryEntry {
    /// Human-readable form: plain strings stay bare, everything else is
    /// rendered as compact JSON.
    pub fn display(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// One decoded device state snapshot
///
/// Frames are immutable once constructed; the decoder never exposes a
/// partially-decoded record as a `Frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub registers: RegisterFile,
    pub stack: HistoryEntry,
    pub instructions: HistoryEntry,
}

/// Current and previous value of a register, as shown in the register table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterValue {
    pub current: i64,
    pub previous: i64,
}

/// Operator-visible state of the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    /// Acquisition disabled or no port selected
    #[default]
    Idle,
    /// Opening the selected port
    Connecting,
    /// Receiving snapshots
    Reading,
    /// The last open or read attempt failed
    Error,
}

/// Statistics for acquisition operations
///
/// Tracks decode success and link health so sustained failure is visible
/// to the operator as more than just an absence of new frames.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionStats {
    /// Frames successfully decoded and delivered
    pub frames_decoded: u64,
    /// Lines discarded because they failed to decode
    pub decode_failures: u64,
    /// Read cycles that elapsed without a complete line
    pub read_timeouts: u64,
    /// Mid-session link losses
    pub link_drops: u64,
}

impl AcquisitionStats {
    /// Decode success rate as a percentage
    pub fn decode_success_rate(&self) -> f64 {
        let total = self.frames_decoded + self.decode_failures;
        if total == 0 {
            100.0
        } else {
            (self.frames_decoded as f64 / total as f64) * 100.0
        }
    }
}
