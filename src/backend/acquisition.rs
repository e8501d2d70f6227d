//! Acquisition loop: the background reader that turns a live link into
//! a stream of frames
//!
//! The loop runs on a dedicated thread for the process lifetime and is the
//! only owner of the serial link. Each cycle it re-observes the shared
//! [`AcquisitionControl`], so every blocking read is bounded by the link's
//! read timeout and stop latency never exceeds one timeout plus one cycle.
//!
//! # State machine
//!
//! ```text
//! Idle ──(enabled + port selected)──▶ Connecting ──(open ok)──▶ Reading
//!  ▲                                     │                        │
//!  │◀──(open failed: treated as stop)────┘                        │
//!  └───────────── Stopping ◀──(disabled, port change, link loss)──┘
//! ```
//!
//! `Stopping` always closes the link before `Idle` runs again, so a port
//! change never has two ports open at once: the old port is released, then
//! `Connecting` claims the new one.
//!
//! # Resynchronization
//!
//! A line that fails to decode is discarded. The loop then reads and
//! decodes up to `decode_retry_limit` (default 1) additional lines before
//! giving up on the cycle; the bound keeps a corrupt stream from starving
//! re-observation of operator intent. Decode failures are counted in
//! [`AcquisitionStats`] so a persistently corrupt stream is diagnosable.

use crate::backend::decoder::decode;
use crate::backend::link::SerialLink;
use crate::backend::queue::FrameSender;
use crate::backend::{AcquisitionControl, StatusEvent};
use crate::config::AppConfig;
use crate::error::LinkError;
use crate::types::{AcquisitionStats, LinkStatus};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often accumulated stats are published to the presentation side
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// States of the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Acquisition disabled; re-check after a short sleep
    Idle,
    /// Claim the selected port
    Connecting,
    /// Read, decode, deliver
    Reading,
    /// Release the link, then return to `Idle`
    Stopping,
}

impl LoopState {
    fn status(self) -> LinkStatus {
        match self {
            LoopState::Idle | LoopState::Stopping => LinkStatus::Idle,
            LoopState::Connecting => LinkStatus::Connecting,
            LoopState::Reading => LinkStatus::Reading,
        }
    }
}

/// The worker that runs the acquisition loop
pub struct AcquisitionWorker {
    control: Arc<AcquisitionControl>,
    running: Arc<AtomicBool>,
    link: Box<dyn SerialLink>,
    frames: FrameSender,
    events: Sender<StatusEvent>,
    state: LoopState,
    idle_poll: Duration,
    decode_retry_limit: u32,
    stats: AcquisitionStats,
    stats_dirty: bool,
    last_stats: Instant,
}

impl AcquisitionWorker {
    pub fn new(
        config: &AppConfig,
        control: Arc<AcquisitionControl>,
        running: Arc<AtomicBool>,
        link: Box<dyn SerialLink>,
        frames: FrameSender,
        events: Sender<StatusEvent>,
    ) -> Self {
        Self {
            control,
            running,
            link,
            frames,
            events,
            state: LoopState::Idle,
            idle_poll: config.acquisition.idle_poll(),
            decode_retry_limit: config.acquisition.decode_retry_limit,
            stats: AcquisitionStats::default(),
            stats_dirty: false,
            last_stats: Instant::now(),
        }
    }

    /// Run the loop until the process-lifetime `running` flag clears
    ///
    /// The link is closed on every exit path; the serial implementation
    /// additionally releases the OS handle on drop, which covers thread
    /// teardown after a panic.
    pub fn run(mut self) {
        tracing::info!("Acquisition worker started");

        while self.running.load(Ordering::SeqCst) {
            self.step();
            self.publish_stats();
        }

        self.link.close();
        let _ = self.events.send(StatusEvent::Shutdown);
        tracing::info!("Acquisition worker stopped");
    }

    /// Advance the state machine by one cycle
    pub fn step(&mut self) {
        match self.state {
            LoopState::Idle => self.idle(),
            LoopState::Connecting => self.connect(),
            LoopState::Reading => self.read_cycle(),
            LoopState::Stopping => self.stop(),
        }
    }

    /// Current state, for tests and diagnostics
    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    fn transition(&mut self, next: LoopState) {
        if next != self.state {
            tracing::debug!("Acquisition {:?} -> {:?}", self.state, next);
            self.state = next;
            let _ = self.events.send(StatusEvent::Link(next.status()));
        }
    }

    fn idle(&mut self) {
        let (enabled, port) = self.control.snapshot();
        if enabled && port.is_some() {
            self.transition(LoopState::Connecting);
        } else {
            std::thread::sleep(self.idle_poll);
        }
    }

    fn connect(&mut self) {
        let (enabled, port) = self.control.snapshot();
        if !enabled {
            self.transition(LoopState::Idle);
            return;
        }
        let Some(port) = port else {
            self.transition(LoopState::Idle);
            return;
        };

        match self.link.open(&port) {
            Ok(()) => self.transition(LoopState::Reading),
            Err(e) => {
                // The port cannot be claimed: treated as an operator stop,
                // not a retry loop
                tracing::warn!("Failed to open {}: {}", port, e);
                self.control.stop();
                let _ = self.events.send(StatusEvent::LinkError(e.to_string()));
                self.transition(LoopState::Idle);
            }
        }
    }

    fn read_cycle(&mut self) {
        // Re-observe operator intent before blocking on the link
        let (enabled, selected) = self.control.snapshot();
        if !enabled {
            self.transition(LoopState::Stopping);
            return;
        }
        match selected.as_deref() {
            None => {
                self.transition(LoopState::Stopping);
                return;
            }
            Some(port) if self.link.open_port() != Some(port) => {
                // The old port closes in Stopping before Connecting claims
                // the new one
                tracing::info!("Selected port changed to {}, reconnecting", port);
                self.transition(LoopState::Stopping);
                return;
            }
            Some(_) => {}
        }

        match self.link.read_line() {
            Ok(line) => self.deliver(&line),
            Err(LinkError::Timeout) => {
                self.stats.read_timeouts += 1;
                self.stats_dirty = true;
            }
            Err(e) => {
                tracing::warn!("Link lost: {}", e);
                self.stats.link_drops += 1;
                self.stats_dirty = true;
                let _ = self.events.send(StatusEvent::LinkError(e.to_string()));
                // Idle re-enters Connecting while the operator still wants data
                self.transition(LoopState::Stopping);
            }
        }
    }

    /// Decode `line` and deliver the frame; on failure, discard the line
    /// and retry on fresh lines up to `decode_retry_limit` before giving
    /// up on this cycle
    fn deliver(&mut self, line: &[u8]) {
        match decode(line) {
            Ok(frame) => {
                self.stats.frames_decoded += 1;
                self.stats_dirty = true;
                self.frames.push(frame);
                return;
            }
            Err(e) => {
                self.stats.decode_failures += 1;
                self.stats_dirty = true;
                tracing::debug!("Discarding line: {}", e);
            }
        }

        for _ in 0..self.decode_retry_limit {
            let line = match self.link.read_line() {
                Ok(line) => line,
                Err(LinkError::Timeout) => {
                    self.stats.read_timeouts += 1;
                    self.stats_dirty = true;
                    return;
                }
                Err(e) => {
                    tracing::warn!("Link lost during resync: {}", e);
                    self.stats.link_drops += 1;
                    self.stats_dirty = true;
                    let _ = self.events.send(StatusEvent::LinkError(e.to_string()));
                    self.transition(LoopState::Stopping);
                    return;
                }
            };
            match decode(&line) {
                Ok(frame) => {
                    self.stats.frames_decoded += 1;
                    self.stats_dirty = true;
                    self.frames.push(frame);
                    return;
                }
                Err(e) => {
                    self.stats.decode_failures += 1;
                    self.stats_dirty = true;
                    tracing::debug!("Discarding line: {}", e);
                }
            }
        }
        // Still corrupt: move on so control changes stay observable
    }

    fn stop(&mut self) {
        self.link.close();
        self.transition(LoopState::Idle);
    }

    fn publish_stats(&mut self) {
        if self.stats_dirty && self.last_stats.elapsed() >= STATS_INTERVAL {
            let _ = self.events.send(StatusEvent::Stats(self.stats.clone()));
            self.last_stats = Instant::now();
            self.stats_dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_link::{MockLink, MockLinkEvent, MockRead, MOCK_PORT};
    use crate::backend::queue::{frame_queue, FrameReceiver};
    use crossbeam_channel::{unbounded, Receiver};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const VALID_LINE: &str = concat!(
        "{\"registers\":{\"a\":1,\"p\":0,\"pc\":100,\"s\":255,\"x\":0,\"y\":0},",
        "\"stack\":{\"value\":\"PUSH 1\"},\"instructions\":{\"value\":\"LDA #1\"}}"
    );

    struct Harness {
        worker: AcquisitionWorker,
        control: Arc<AcquisitionControl>,
        frames: FrameReceiver,
        events: Receiver<StatusEvent>,
        link_events: Arc<Mutex<Vec<MockLinkEvent>>>,
        script: Arc<Mutex<VecDeque<MockRead>>>,
    }

    fn harness(link: MockLink) -> Harness {
        let mut config = AppConfig::default();
        config.acquisition.idle_poll_ms = 1;

        let control = Arc::new(AcquisitionControl::new());
        let running = Arc::new(AtomicBool::new(true));
        let (frame_tx, frame_rx) = frame_queue();
        let (event_tx, event_rx) = unbounded();
        let link_events = link.events_handle();
        let script = link.script_handle();

        let worker = AcquisitionWorker::new(
            &config,
            control.clone(),
            running,
            Box::new(link),
            frame_tx,
            event_tx,
        );

        Harness {
            worker,
            control,
            frames: frame_rx,
            events: event_rx,
            link_events,
            script,
        }
    }

    /// Drive the harness until it is reading from `port`
    fn start_reading(h: &mut Harness, port: &str) {
        h.control.select_port(Some(port.to_string()));
        h.control.start();
        h.worker.step(); // Idle -> Connecting
        h.worker.step(); // Connecting -> Reading
        assert_eq!(h.worker.state(), LoopState::Reading);
    }

    #[test]
    fn test_stays_idle_while_disabled() {
        let mut h = harness(MockLink::new());
        h.worker.step();
        assert_eq!(h.worker.state(), LoopState::Idle);

        // a selected port alone is not enough
        h.control.select_port(Some(MOCK_PORT.to_string()));
        h.worker.step();
        assert_eq!(h.worker.state(), LoopState::Idle);
    }

    #[test]
    fn test_enabled_without_port_stays_idle() {
        let mut h = harness(MockLink::new());
        h.control.start();
        h.worker.step();
        assert_eq!(h.worker.state(), LoopState::Idle);
    }

    #[test]
    fn test_valid_line_is_delivered() {
        let mut h = harness(MockLink::new().with_reads([MockRead::Line(VALID_LINE.to_string())]));
        start_reading(&mut h, MOCK_PORT);

        h.worker.step();
        let frames = h.frames.drain_all();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].registers.a, 1);
        assert_eq!(h.worker.state(), LoopState::Reading);
        assert_eq!(h.worker.stats().frames_decoded, 1);
    }

    #[test]
    fn test_resync_consumes_one_extra_line_per_cycle() {
        // Two malformed lines then a valid one: the first cycle discards
        // both malformed lines and gives up; the next cycle delivers the
        // valid line. Exactly one frame, no operator intervention.
        let mut h = harness(MockLink::new().with_reads([
            MockRead::Line("{\"registers\":".to_string()),
            MockRead::Line("garbage".to_string()),
            MockRead::Line(VALID_LINE.to_string()),
        ]));
        start_reading(&mut h, MOCK_PORT);

        h.worker.step();
        assert!(h.frames.drain_all().is_empty());
        assert_eq!(h.worker.stats().decode_failures, 2);
        assert_eq!(h.worker.state(), LoopState::Reading);

        h.worker.step();
        assert_eq!(h.frames.drain_all().len(), 1);
        assert_eq!(h.worker.stats().frames_decoded, 1);
    }

    #[test]
    fn test_resync_recovers_within_one_cycle() {
        // One malformed line followed by a valid one is recovered by the
        // single in-cycle retry.
        let mut h = harness(MockLink::new().with_reads([
            MockRead::Line("garbage".to_string()),
            MockRead::Line(VALID_LINE.to_string()),
        ]));
        start_reading(&mut h, MOCK_PORT);

        h.worker.step();
        assert_eq!(h.frames.drain_all().len(), 1);
        assert_eq!(h.worker.stats().decode_failures, 1);
    }

    #[test]
    fn test_timeout_keeps_reading() {
        let mut h = harness(MockLink::new().with_reads([MockRead::Timeout]));
        start_reading(&mut h, MOCK_PORT);

        h.worker.step();
        assert_eq!(h.worker.state(), LoopState::Reading);
        assert_eq!(h.worker.stats().read_timeouts, 1);
    }

    #[test]
    fn test_disconnect_closes_and_reconnects() {
        let mut h = harness(MockLink::new().with_reads([MockRead::Disconnect]));
        start_reading(&mut h, MOCK_PORT);

        h.worker.step(); // Reading -> Stopping
        assert_eq!(h.worker.state(), LoopState::Stopping);
        h.worker.step(); // Stopping closes, -> Idle
        assert_eq!(h.worker.state(), LoopState::Idle);

        // operator intent persists, so the loop claims the port again
        h.worker.step();
        h.worker.step();
        assert_eq!(h.worker.state(), LoopState::Reading);

        let events = h.link_events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                MockLinkEvent::Opened(MOCK_PORT.to_string()),
                MockLinkEvent::Closed(MOCK_PORT.to_string()),
                MockLinkEvent::Opened(MOCK_PORT.to_string()),
            ]
        );
    }

    #[test]
    fn test_unavailable_port_is_treated_as_stop() {
        let mut h = harness(MockLink::new().with_open_failure());
        h.control.select_port(Some(MOCK_PORT.to_string()));
        h.control.start();

        h.worker.step(); // Idle -> Connecting
        h.worker.step(); // open fails -> Idle, enabled cleared
        assert_eq!(h.worker.state(), LoopState::Idle);
        assert!(!h.control.is_enabled());
        assert!(h
            .events
            .try_iter()
            .any(|e| matches!(e, StatusEvent::LinkError(_))));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut h = harness(MockLink::new().with_reads([MockRead::Timeout]));
        start_reading(&mut h, MOCK_PORT);

        h.control.stop();
        h.control.stop();
        h.worker.step(); // Reading -> Stopping
        h.worker.step(); // Stopping -> Idle
        assert_eq!(h.worker.state(), LoopState::Idle);
        assert!(!h.control.is_enabled());

        let events = h.link_events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&MockLinkEvent::Closed(MOCK_PORT.to_string()))
        );
    }

    #[test]
    fn test_port_switch_closes_old_before_opening_new() {
        let mut h = harness(MockLink::new().with_reads([MockRead::Timeout, MockRead::Timeout]));
        start_reading(&mut h, "mockA");

        h.control.select_port(Some("mockB".to_string()));
        h.worker.step(); // Reading observes the change -> Stopping
        h.worker.step(); // Stopping closes mockA -> Idle
        h.worker.step(); // Idle -> Connecting
        h.worker.step(); // Connecting opens mockB -> Reading
        assert_eq!(h.worker.state(), LoopState::Reading);

        let events = h.link_events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                MockLinkEvent::Opened("mockA".to_string()),
                MockLinkEvent::Closed("mockA".to_string()),
                MockLinkEvent::Opened("mockB".to_string()),
            ]
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        // valid, malformed, valid: two frames delivered, in order
        let mut h = harness(MockLink::new().with_reads([
            MockRead::Line(VALID_LINE.to_string()),
            MockRead::Line("{\"registers\":".to_string()),
            MockRead::Line(VALID_LINE.to_string()),
        ]));
        start_reading(&mut h, MOCK_PORT);

        h.worker.step(); // first valid line
        h.worker.step(); // malformed, retry delivers the second valid line

        let frames = h.frames.drain_all();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.registers.a == 1));
        assert_eq!(h.worker.stats().frames_decoded, 2);
        assert_eq!(h.worker.stats().decode_failures, 1);
    }

    #[test]
    fn test_custom_retry_limit_is_honored() {
        let mut config = AppConfig::default();
        config.acquisition.idle_poll_ms = 1;
        config.acquisition.decode_retry_limit = 2;

        let link = MockLink::new().with_reads([
            MockRead::Line("bad1".to_string()),
            MockRead::Line("bad2".to_string()),
            MockRead::Line(VALID_LINE.to_string()),
        ]);
        let control = Arc::new(AcquisitionControl::new());
        let running = Arc::new(AtomicBool::new(true));
        let (frame_tx, frame_rx) = frame_queue();
        let (event_tx, _event_rx) = unbounded();
        let mut worker = AcquisitionWorker::new(
            &config,
            control.clone(),
            running,
            Box::new(link),
            frame_tx,
            event_tx,
        );

        control.select_port(Some(MOCK_PORT.to_string()));
        control.start();
        worker.step();
        worker.step();

        // with two retries the whole burst resolves in one cycle
        worker.step();
        assert_eq!(frame_rx.drain_all().len(), 1);
        assert_eq!(worker.stats().decode_failures, 2);
    }

    #[test]
    fn test_run_exits_and_closes_link() {
        let link = MockLink::new().with_reads([MockRead::Timeout]);
        let link_events = link.events_handle();

        let mut config = AppConfig::default();
        config.acquisition.idle_poll_ms = 1;
        let control = Arc::new(AcquisitionControl::new());
        let running = Arc::new(AtomicBool::new(true));
        let (frame_tx, _frame_rx) = frame_queue();
        let (event_tx, event_rx) = unbounded();
        let worker = AcquisitionWorker::new(
            &config,
            control.clone(),
            running.clone(),
            Box::new(link),
            frame_tx,
            event_tx,
        );

        control.select_port(Some(MOCK_PORT.to_string()));
        control.start();
        let handle = std::thread::spawn(move || worker.run());

        std::thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();

        let events = link_events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&MockLinkEvent::Closed(MOCK_PORT.to_string()))
        );
        assert!(event_rx
            .try_iter()
            .any(|e| matches!(e, StatusEvent::Shutdown)));
    }

    #[test]
    fn test_frames_keep_flowing_after_script_refill() {
        let mut h = harness(MockLink::new());
        start_reading(&mut h, MOCK_PORT);

        h.worker.step(); // timeout (empty script)
        h.script
            .lock()
            .unwrap()
            .push_back(MockRead::Line(VALID_LINE.to_string()));
        h.worker.step();
        assert_eq!(h.frames.drain_all().len(), 1);
    }
}
