//! Consumer/reconciler: drains delivered frames into derived display state
//!
//! Runs on the presentation thread on a fixed tick. Each tick drains the
//! delivery queue without blocking and folds every frame, in arrival
//! order, into:
//!
//! - the append-only history log (feeds the dump feature)
//! - per-register `(current, previous)` pairs for the register table
//! - the stack and instruction display histories
//!
//! The reconciler exposes read-only snapshots; rendering them is the
//! presentation layer's job.

use crate::backend::queue::FrameReceiver;
use crate::error::{MonitorError, Result};
use crate::types::{Frame, Register, RegisterValue};
use std::io::Write;
use std::path::Path;

/// Derived state fed by the delivery queue
pub struct FrameConsumer {
    frames: FrameReceiver,
    /// Every frame ever delivered, in delivery order
    history: Vec<Frame>,
    registers: [RegisterValue; Register::ALL.len()],
    stack: Vec<String>,
    instructions: Vec<String>,
}

impl FrameConsumer {
    pub fn new(frames: FrameReceiver) -> Self {
        Self {
            frames,
            history: Vec::new(),
            registers: [RegisterValue::default(); Register::ALL.len()],
            stack: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Drain every queued frame and fold it into the derived state;
    /// returns the number of frames delivered this tick. Never blocks.
    pub fn tick(&mut self) -> usize {
        let drained = self.frames.drain_all();
        let count = drained.len();
        for frame in drained {
            self.apply(frame);
        }
        count
    }

    fn apply(&mut self, frame: Frame) {
        for reg in Register::ALL {
            let slot = &mut self.registers[reg.index()];
            slot.previous = slot.current;
            slot.current = frame.registers.get(reg);
        }
        self.stack.push(frame.stack.display());
        self.instructions.push(frame.instructions.display());
        self.history.push(frame);
    }

    /// Current and previous value of one register
    pub fn register(&self, reg: Register) -> RegisterValue {
        self.registers[reg.index()]
    }

    /// All registers in display order
    pub fn registers(&self) -> impl Iterator<Item = (Register, RegisterValue)> + '_ {
        Register::ALL
            .iter()
            .map(|reg| (*reg, self.registers[reg.index()]))
    }

    /// Stack history, oldest first
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Instruction history, oldest first
    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    /// Number of frames delivered so far
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Serialize the full history to `path`, one frame per line as
    /// compact JSON, each line CRLF-terminated. A no-op when no frames
    /// have been delivered.
    pub fn dump_to(&self, path: &Path) -> Result<()> {
        if self.history.is_empty() {
            return Ok(());
        }

        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        for frame in &self.history {
            let line = serde_json::to_string(frame)
                .map_err(|e| MonitorError::Serialization(e.to_string()))?;
            write!(writer, "{}\r\n", line)?;
        }
        writer.flush()?;

        tracing::info!("Dumped {} frames to {}", self.history.len(), path.display());
        Ok(())
    }
}
