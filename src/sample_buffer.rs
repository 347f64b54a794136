/// Byte buffer between the audio capture callback and the periodic tick
/// The producer appends raw PCM bytes as they arrive; the consumer pulls
/// fixed-size frames on its own schedule

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// What to do when a push would exceed capacity.
///
/// `DiscardOldest` favors recency over completeness — the visualizer should
/// always show what is playing *now*, so stale bytes are the ones to lose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Drop the oldest buffered bytes to make room (default)
    DiscardOldest,
    /// Keep what we have and drop the incoming bytes instead
    RejectNewest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DiscardOldest
    }
}

/// Overflow-discarding byte buffer with zero-fill on underrun.
///
/// There are no error conditions here by design: the capture callback must
/// never block, and a starved consumer degrades to silence instead of faulting.
pub struct SampleBuffer {
    bytes: VecDeque<u8>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` bytes (typically 2x frame size)
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            bytes: VecDeque::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    /// Append captured audio bytes. Never blocks, never fails.
    pub fn push(&mut self, data: &[u8]) {
        match self.policy {
            OverflowPolicy::DiscardOldest => {
                // Incoming data larger than the whole buffer: only the tail survives
                let data = if data.len() > self.capacity {
                    &data[data.len() - self.capacity..]
                } else {
                    data
                };

                let overflow = (self.bytes.len() + data.len()).saturating_sub(self.capacity);
                if overflow > 0 {
                    self.bytes.drain(..overflow);
                }
                self.bytes.extend(data);
            }
            OverflowPolicy::RejectNewest => {
                let room = self.capacity - self.bytes.len();
                self.bytes.extend(&data[..data.len().min(room)]);
            }
        }
    }

    /// Fill `frame` with the oldest available bytes, zero-filling any shortfall
    pub fn read_frame(&mut self, frame: &mut [u8]) {
        let available = self.bytes.len().min(frame.len());

        for slot in frame.iter_mut().take(available) {
            // available <= len, so this can't fail
            *slot = self.bytes.pop_front().unwrap_or(0);
        }

        // Underrun: the rest of the frame is silence
        for slot in frame.iter_mut().skip(available) {
            *slot = 0;
        }
    }

    /// Number of buffered bytes not yet consumed
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ========== Tests ============

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut buf = SampleBuffer::new(8, OverflowPolicy::DiscardOldest);
        buf.push(&[1, 2, 3, 4]);

        let mut frame = [0u8; 4];
        buf.read_frame(&mut frame);
        assert_eq!(frame, [1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_underrun_zero_fills() {
        let mut buf = SampleBuffer::new(8, OverflowPolicy::DiscardOldest);
        buf.push(&[9, 9]);

        let mut frame = [0xFFu8; 6];
        buf.read_frame(&mut frame);

        // Oldest bytes first, then silence
        assert_eq!(frame, [9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_read_is_silent() {
        let mut buf = SampleBuffer::new(8, OverflowPolicy::DiscardOldest);
        let mut frame = [0xAAu8; 4];
        buf.read_frame(&mut frame);
        assert_eq!(frame, [0, 0, 0, 0]);
    }

    #[test]
    fn test_overflow_discards_oldest() {
        let mut buf = SampleBuffer::new(4, OverflowPolicy::DiscardOldest);
        buf.push(&[1, 2, 3, 4]);
        buf.push(&[5, 6]);

        let mut frame = [0u8; 4];
        buf.read_frame(&mut frame);

        // 1 and 2 were the oldest, so they were dropped
        assert_eq!(frame, [3, 4, 5, 6]);
    }

    #[test]
    fn test_overflow_rejects_newest() {
        let mut buf = SampleBuffer::new(4, OverflowPolicy::RejectNewest);
        buf.push(&[1, 2, 3, 4]);
        buf.push(&[5, 6]);

        let mut frame = [0u8; 4];
        buf.read_frame(&mut frame);

        // Buffer was full, the new bytes were dropped
        assert_eq!(frame, [1, 2, 3, 4]);
    }

    #[test]
    fn test_oversized_push_keeps_tail() {
        let mut buf = SampleBuffer::new(4, OverflowPolicy::DiscardOldest);
        buf.push(&[1, 2, 3, 4, 5, 6, 7, 8]);

        assert_eq!(buf.len(), 4);

        let mut frame = [0u8; 4];
        buf.read_frame(&mut frame);
        assert_eq!(frame, [5, 6, 7, 8]);
    }

    #[test]
    fn test_order_preserved_across_partial_reads() {
        let mut buf = SampleBuffer::new(8, OverflowPolicy::DiscardOldest);
        buf.push(&[1, 2, 3, 4, 5, 6]);

        let mut frame = [0u8; 2];
        buf.read_frame(&mut frame);
        assert_eq!(frame, [1, 2]);

        buf.push(&[7, 8]);

        let mut frame = [0u8; 6];
        buf.read_frame(&mut frame);
        assert_eq!(frame, [3, 4, 5, 6, 7, 8]);
    }
}
