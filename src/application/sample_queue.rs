// Per-channel buffer of samples waiting to be displayed
use crate::domain::telemetry::{Channel, Sample};
use std::collections::VecDeque;

/// Every this many unread samples past the threshold, the backlog is reported again
const BACKLOG_REPORT_STEP: usize = 10;

/// Unbounded FIFO of not-yet-displayed samples.
///
/// The producer may outrun the playback cadence; nothing is ever dropped. Growth past
/// `backlog_threshold` is only observed: a warning is logged for each further
/// `BACKLOG_REPORT_STEP` samples of excess.
#[derive(Debug)]
pub struct SampleQueue {
    channel: Channel,
    samples: VecDeque<Sample>,
    backlog_threshold: usize,
    reported_excess_steps: usize,
    backlog_warnings: u64,
}

impl SampleQueue {
    pub fn new(channel: Channel, backlog_threshold: usize) -> Self {
        Self {
            channel,
            samples: VecDeque::new(),
            backlog_threshold,
            reported_excess_steps: 0,
            backlog_warnings: 0,
        }
    }

    /// Appends a batch at the tail. Returns true when the queue went from empty to
    /// non-empty, i.e. the channel's playback must (re)start.
    pub fn append(&mut self, samples: &[Sample]) -> bool {
        if samples.is_empty() {
            return false;
        }

        let was_empty = self.samples.is_empty();
        self.samples.extend(samples.iter().copied());
        self.observe_backlog();

        was_empty
    }

    pub fn pop(&mut self) -> Option<Sample> {
        let sample = self.samples.pop_front();
        if self.samples.len() <= self.backlog_threshold {
            self.reported_excess_steps = 0;
        }
        sample
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Number of backlog warnings emitted since creation
    #[cfg(test)]
    pub fn backlog_warnings(&self) -> u64 {
        self.backlog_warnings
    }

    fn observe_backlog(&mut self) {
        let len = self.samples.len();
        if len <= self.backlog_threshold {
            return;
        }

        let steps = (len - self.backlog_threshold - 1) / BACKLOG_REPORT_STEP + 1;
        if steps > self.reported_excess_steps {
            self.reported_excess_steps = steps;
            self.backlog_warnings += 1;
            tracing::warn!(
                "Playback backlog for {}: {} unread samples (threshold {}, warning #{})",
                self.channel,
                len,
                self.backlog_threshold,
                self.backlog_warnings
            );
        }
    }
}
