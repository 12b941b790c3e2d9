// Playback scheduler - paces display updates at a fixed cadence per channel
use crate::domain::telemetry::Channel;
use std::future::poll_fn;
use std::task::{Context, Poll};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

/// A self-cancelling repeating timer for one channel.
///
/// The first tick fires one period after `start`. Late ticks are delayed rather than
/// bunched so a slow event loop never speeds playback up.
#[derive(Debug)]
pub struct PlaybackScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl PlaybackScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Starts the cadence. Returns false if it was already running, in which case the
    /// existing cadence is kept untouched.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }

        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        true
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn poll_tick(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match self.interval.as_mut() {
            Some(interval) => interval.poll_tick(cx).map(|_| ()),
            None => Poll::Pending,
        }
    }

    /// Waits for the next tick. Never completes while stopped.
    #[cfg(test)]
    pub async fn tick(&mut self) {
        poll_fn(|cx| self.poll_tick(cx)).await
    }
}

/// One scheduler per channel, polled together by the session loop
#[derive(Debug)]
pub struct PlaybackSchedulers {
    schedulers: [PlaybackScheduler; 3],
}

impl PlaybackSchedulers {
    pub fn new(period: Duration) -> Self {
        Self {
            schedulers: Channel::ALL.map(|_| PlaybackScheduler::new(period)),
        }
    }

    pub fn start(&mut self, channel: Channel) -> bool {
        let started = self.schedulers[channel.index()].start();
        if started {
            tracing::debug!("Playback started for {}", channel);
        }
        started
    }

    pub fn stop(&mut self, channel: Channel) {
        if self.schedulers[channel.index()].is_running() {
            tracing::debug!("Playback stopped for {}", channel);
        }
        self.schedulers[channel.index()].stop();
    }

    pub fn stop_all(&mut self) {
        for channel in Channel::ALL {
            self.stop(channel);
        }
    }

    #[cfg(test)]
    pub fn is_running(&self, channel: Channel) -> bool {
        self.schedulers[channel.index()].is_running()
    }

    #[cfg(test)]
    pub fn any_running(&self) -> bool {
        self.schedulers.iter().any(PlaybackScheduler::is_running)
    }

    /// Resolves with the next channel whose cadence fired. Cancel-safe.
    pub async fn next_tick(&mut self) -> Channel {
        poll_fn(|cx| {
            for channel in Channel::ALL {
                if self.schedulers[channel.index()].poll_tick(cx).is_ready() {
                    return Poll::Ready(channel);
                }
            }
            Poll::Pending
        })
        .await
    }
}
