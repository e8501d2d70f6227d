//! Delivery queue: the frame channel between acquisition and display
//!
//! An unbounded FIFO with exactly one producer (the acquisition loop) and
//! one consumer (the presentation-thread reconciler). `push` never blocks;
//! `drain_all` removes and returns everything queued, in arrival order,
//! without blocking. FIFO order is the only ordering guarantee, and every
//! delivered frame is delivered exactly once.

use crate::types::Frame;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Create a connected producer/consumer pair
pub fn frame_queue() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = unbounded();
    (FrameSender(tx), FrameReceiver(rx))
}

/// Producer half, owned by the acquisition loop
pub struct FrameSender(Sender<Frame>);

impl FrameSender {
    /// Enqueue a frame; never blocks
    ///
    /// A send error only means the consumer is gone, which only happens
    /// during shutdown; the frame is dropped with the rest of the session.
    pub fn push(&self, frame: Frame) {
        let _ = self.0.send(frame);
    }
}

/// Consumer half, owned by the reconciler on the presentation thread
pub struct FrameReceiver(Receiver<Frame>);

impl FrameReceiver {
    /// Remove and return every currently queued frame, oldest first;
    /// returns an empty vec when nothing is queued. Never blocks.
    pub fn drain_all(&self) -> Vec<Frame> {
        self.0.try_iter().collect()
    }

    /// Number of frames currently queued
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HistoryEntry, RegisterFile};
    use proptest::prelude::*;

    fn frame(tag: i64) -> Frame {
        Frame {
            registers: RegisterFile {
                a: tag,
                p: 0,
                pc: tag,
                s: 255,
                x: 0,
                y: 0,
            },
            stack: HistoryEntry {
                value: serde_json::json!(format!("PUSH {}", tag)),
            },
            instructions: HistoryEntry {
                value: serde_json::json!(format!("LDA #{}", tag)),
            },
        }
    }

    #[test]
    fn test_drain_empty_queue() {
        let (_tx, rx) = frame_queue();
        assert!(rx.drain_all().is_empty());
        assert!(rx.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = frame_queue();
        for i in 0..5 {
            tx.push(frame(i));
        }

        let drained = rx.drain_all();
        let tags: Vec<_> = drained.iter().map(|f| f.registers.a).collect();
        assert_eq!(tags, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_no_duplication_across_drains() {
        let (tx, rx) = frame_queue();
        tx.push(frame(1));
        tx.push(frame(2));

        assert_eq!(rx.drain_all().len(), 2);
        assert!(rx.drain_all().is_empty());

        tx.push(frame(3));
        let drained = rx.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].registers.a, 3);
    }

    #[test]
    fn test_push_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = frame_queue();
        drop(rx);
        tx.push(frame(1));
    }

    #[test]
    fn test_drain_across_threads() {
        let (tx, rx) = frame_queue();
        let producer = std::thread::spawn(move || {
            for i in 0..100 {
                tx.push(frame(i));
            }
        });
        producer.join().unwrap();

        let tags: Vec<_> = rx.drain_all().iter().map(|f| f.registers.a).collect();
        assert_eq!(tags, (0..100).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn prop_drain_returns_exactly_what_was_pushed(tags in prop::collection::vec(any::<i64>(), 0..64)) {
            let (tx, rx) = frame_queue();
            for &tag in &tags {
                tx.push(frame(tag));
            }

            let drained: Vec<_> = rx.drain_all().iter().map(|f| f.registers.a).collect();
            prop_assert_eq!(drained, tags);
            prop_assert!(rx.drain_all().is_empty());
        }
    }
}
