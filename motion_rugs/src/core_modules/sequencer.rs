// THEORY:
// The `FrameSequencer` restores order to a stream of frames that may arrive out of
// sequence. It owns two structures: a pending buffer of early arrivals keyed by
// sequence number, and the bounded sliding window of released frames that every
// later stage works on.
//
// Key architectural principles:
// 1.  **Contiguous Release**: A frame is released only when its number is the next
//     expected one. Releasing it may unblock a run of buffered frames, which are
//     drained in order in the same call. The window therefore only ever holds a
//     strictly increasing run of frame numbers whose only gaps are numbers that
//     were explicitly skipped.
// 2.  **Skipped Numbers**: A frame refused before it reaches the sequencer must not
//     leave a hole the window waits on forever. `skip` marks its number as passed,
//     and the run behind it is released as if the frame had arrived.
// 3.  **Uniform Columns**: The first released frame fixes the number of movers.
//     Buffered frames admitted before that count was known are re-checked on
//     release and dropped (their numbers skipped) when they disagree.
// 4.  **Bounded Window**: After every append the window is trimmed from the front
//     until it fits the configured column budget. The oldest frame is always the
//     first to go.
// 5.  **Bounded Buffer**: Early arrivals can only be held so far ahead of the
//     expected number (`max_pending_ahead`). Anything further out is refused and
//     reported rather than silently accumulating. Frames older than the expected
//     number can never be released and are refused as stale.

use crate::core_modules::reading::Frame;
use crate::error::SequenceError;
use log::{debug, trace, warn};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Reorders incoming frames and maintains the bounded window of released frames.
#[derive(Debug)]
pub struct FrameSequencer {
    /// The sequence number the window is waiting for.
    next_expected: u64,
    /// Early arrivals waiting for the gap before them to close.
    pending: BTreeMap<u64, Frame>,
    /// Future numbers that will never arrive and must not block the window.
    skipped: BTreeSet<u64>,
    /// Movers per frame, fixed by the first released frame.
    object_count: Option<usize>,
    /// Released frames, oldest first.
    window: VecDeque<Frame>,
    /// Maximum number of frames (rug columns) kept in the window.
    capacity: usize,
    /// How far ahead of `next_expected` a frame may be buffered. `None` is unbounded.
    max_pending_ahead: Option<u64>,
}

impl FrameSequencer {
    pub fn new(capacity: usize, max_pending_ahead: Option<u64>) -> Self {
        Self {
            next_expected: 0,
            pending: BTreeMap::new(),
            skipped: BTreeSet::new(),
            object_count: None,
            window: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            max_pending_ahead,
        }
    }

    /// Accepts one frame. Returns how many frames were released into the window,
    /// which is zero when the frame had to be buffered.
    pub fn submit(&mut self, frame: Frame) -> Result<usize, SequenceError> {
        let number = frame.number;

        if number < self.next_expected {
            return Err(SequenceError::Stale {
                frame: number,
                next_expected: self.next_expected,
            });
        }

        if number > self.next_expected {
            if let Some(limit) = self.max_pending_ahead {
                if number - self.next_expected > limit {
                    return Err(SequenceError::TooFarAhead {
                        frame: number,
                        next_expected: self.next_expected,
                        limit,
                    });
                }
            }
            self.skipped.remove(&number);
            if self.pending.insert(number, frame).is_some() {
                debug!("frame {} re-sent while pending; keeping the latest copy", number);
            } else {
                trace!("buffered frame {} while waiting for {}", number, self.next_expected);
            }
            return Ok(0);
        }

        // --- 1. Release the expected frame ---
        self.append(frame);
        let mut released = 1;

        // --- 2. Drain the contiguous run it unblocked ---
        released += self.drain();

        if released > 1 {
            debug!("released {} frames up to {}", released, self.next_expected - 1);
        }
        Ok(released)
    }

    /// Marks `number` as never arriving. When it is the expected number the run
    /// buffered behind it is released; returns how many frames that released.
    ///
    /// Numbers already passed, already buffered, or beyond the buffer limit are
    /// left alone.
    pub fn skip(&mut self, number: u64) -> usize {
        if number < self.next_expected || self.pending.contains_key(&number) {
            return 0;
        }
        if number > self.next_expected {
            let within_limit = self.max_pending_ahead.is_none_or(|limit| number - self.next_expected <= limit);
            if within_limit {
                trace!("marking frame {} as skipped", number);
                self.skipped.insert(number);
            }
            return 0;
        }

        self.next_expected = number + 1;
        let released = self.drain();
        debug!("skipped frame {}, released {} buffered frames", number, released);
        released
    }

    /// Moves every buffered frame that is now contiguous into the window, stepping
    /// over skipped numbers.
    fn drain(&mut self) -> usize {
        let mut released = 0;
        loop {
            if let Some(buffered) = self.pending.remove(&self.next_expected) {
                if let Some(expected) = self.object_count.filter(|&count| count != buffered.len()) {
                    warn!(
                        "dropping buffered frame {}: {} movers, stream has {}",
                        buffered.number,
                        buffered.len(),
                        expected
                    );
                    self.next_expected += 1;
                    continue;
                }
                self.append(buffered);
                released += 1;
            } else if self.skipped.remove(&self.next_expected) {
                self.next_expected += 1;
            } else {
                return released;
            }
        }
    }

    fn append(&mut self, frame: Frame) {
        self.next_expected = frame.number + 1;
        if self.object_count.is_none() {
            self.object_count = Some(frame.len());
        }
        self.window.push_back(frame);
        self.trim();
    }

    fn trim(&mut self) {
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Changes the column budget, evicting the oldest frames if the window no longer fits.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.trim();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// Movers per frame, once a frame has been released into the window.
    pub fn object_count(&self) -> Option<usize> {
        self.object_count
    }

    /// Number of early frames waiting for a gap to close.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn window(&self) -> &VecDeque<Frame> {
        &self.window
    }

    /// Sequence numbers currently in the window, oldest first.
    pub fn window_numbers(&self) -> Vec<u64> {
        self.window.iter().map(|frame| frame.number).collect()
    }
}
