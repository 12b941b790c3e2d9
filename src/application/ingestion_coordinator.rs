// Ingestion coordinator - routes decoded frames into per-channel playback
use crate::application::dashboard_view::DashboardView;
use crate::application::playback_scheduler::PlaybackSchedulers;
use crate::application::prediction_client::PredictionRequest;
use crate::application::sample_queue::SampleQueue;
use crate::application::windowed_series::WindowedSeries;
use crate::domain::connection::{ConnectionState, ConnectionStateMachine, Transition};
use crate::domain::telemetry::{Channel, DisplayedPoint, MetricsBatch};
use crate::domain::viewport::WindowCaps;
use crate::infrastructure::config::PlaybackSettings;
use crate::infrastructure::frame_decoder::{decode_frame, Frame};

/// Where a manually requested prediction takes its readings from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    /// The values currently shown on the numeric readouts
    LatestReadout,
    /// The first samples of the most recent metrics frame
    LatestBatch,
}

/// Owns the connection state and every channel's queue, window and scheduler.
///
/// Frames and ticks are fed in from a single loop, so no state is shared across tasks.
pub struct IngestionCoordinator {
    connection: ConnectionStateMachine,
    queues: [SampleQueue; 3],
    series: [WindowedSeries; 3],
    schedulers: PlaybackSchedulers,
    window_caps: WindowCaps,
    prediction_armed: bool,
    latest_readouts: [Option<f64>; 3],
    latest_batch: Option<MetricsBatch>,
}

impl IngestionCoordinator {
    pub fn new(playback: &PlaybackSettings, window_caps: WindowCaps) -> Self {
        Self {
            connection: ConnectionStateMachine::new(),
            queues: Channel::ALL.map(|c| SampleQueue::new(c, playback.backlog_threshold)),
            series: Channel::ALL.map(|_| WindowedSeries::new()),
            schedulers: PlaybackSchedulers::new(playback.period()),
            window_caps,
            prediction_armed: false,
            latest_readouts: [None; 3],
            latest_batch: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[cfg(test)]
    pub fn series(&self, channel: Channel) -> &WindowedSeries {
        &self.series[channel.index()]
    }

    #[cfg(test)]
    pub fn queued(&self, channel: Channel) -> usize {
        self.queues[channel.index()].len()
    }

    #[cfg(test)]
    pub fn is_playing(&self, channel: Channel) -> bool {
        self.schedulers.is_running(channel)
    }

    /// A new connection was opened: start idle, waiting, with the prediction gate armed
    pub fn opened(&mut self, view: &mut impl DashboardView) {
        let transition = self.connection.opened();
        tracing::info!("Dashboard connection opened (was {})", transition.previous);
        self.arm_prediction();
        view.standby(true);
    }

    /// Handles one inbound text frame. Decode failures are absorbed here: they reset the
    /// link to idle and raise a notice, but never reach the caller.
    ///
    /// Returns the prediction to fetch when this frame fires the one-shot gate.
    pub fn handle_frame(
        &mut self,
        raw: &str,
        view: &mut impl DashboardView,
    ) -> Option<PredictionRequest> {
        match decode_frame(raw) {
            Ok(Frame::Control(status)) => {
                tracing::debug!("Control frame: {:?}", status);
                let transition = self.connection.on_control(status);
                self.publish(transition, view);
                None
            }
            Ok(Frame::Metrics(batch)) => self.ingest(batch, view),
            Err(e) => {
                tracing::warn!("Discarding unreadable frame {:?}: {}", raw, e);
                let transition = self.connection.on_decode_error();
                self.publish(transition, view);
                None
            }
        }
    }

    pub fn handle_closed(&mut self, view: &mut impl DashboardView) {
        let transition = self.connection.on_closed();
        tracing::info!("Dashboard connection closed (was {})", transition.previous);
        self.publish(transition, view);
    }

    pub fn handle_transport_error(&mut self, error: &str, view: &mut impl DashboardView) {
        tracing::error!("Dashboard connection failed: {}", error);
        let transition = self.connection.on_transport_error();
        self.publish(transition, view);
    }

    /// Displays at most one queued sample for `channel`, then stops its playback once
    /// the queue has drained.
    pub fn tick(&mut self, channel: Channel, view: &mut impl DashboardView) {
        let idx = channel.index();
        let Some(value) = self.queues[idx].pop() else {
            self.schedulers.stop(channel);
            return;
        };

        let cap = self.window_caps.cap_for(view.breakpoint());
        self.series[idx].push(DisplayedPoint::now(value), cap);
        self.latest_readouts[idx] = Some(value);
        tracing::debug!(
            "Displayed {} = {} ({} still queued)",
            channel,
            value,
            self.queues[idx].len()
        );

        view.series_updated(channel, &self.series[idx]);
        view.last_data_received(channel, value);

        if self.queues[idx].is_empty() {
            self.schedulers.stop(channel);
        }
    }

    /// Waits for the next channel whose playback cadence fired
    pub async fn next_tick(&mut self) -> Channel {
        self.schedulers.next_tick().await
    }

    pub fn arm_prediction(&mut self) {
        self.prediction_armed = true;
    }

    pub fn disarm_prediction(&mut self) {
        self.prediction_armed = false;
    }

    #[cfg(test)]
    pub fn is_prediction_armed(&self) -> bool {
        self.prediction_armed
    }

    /// Builds a prediction request on demand, bypassing the one-shot gate
    pub fn manual_prediction(&self, source: PredictionSource) -> Option<PredictionRequest> {
        match source {
            PredictionSource::LatestReadout => {
                PredictionRequest::from_readouts(&self.latest_readouts)
            }
            PredictionSource::LatestBatch => self
                .latest_batch
                .as_ref()
                .and_then(PredictionRequest::from_batch),
        }
    }

    /// Stops every playback cadence. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.schedulers.stop_all();
    }

    fn ingest(
        &mut self,
        batch: MetricsBatch,
        view: &mut impl DashboardView,
    ) -> Option<PredictionRequest> {
        if batch.is_empty() {
            tracing::debug!("Metrics frame carried no samples");
        } else {
            tracing::debug!("Metrics frame with {} samples", batch.len());
        }
        let transition = self.connection.on_metrics();
        self.publish(transition, view);
        view.stream_metrics(&batch);

        for (channel, samples) in batch.iter() {
            if self.queues[channel.index()].append(samples) {
                self.schedulers.start(channel);
            }
        }

        let request = if self.prediction_armed {
            PredictionRequest::from_batch(&batch)
        } else {
            None
        };
        if request.is_some() {
            tracing::info!("First broadcast received, requesting prediction");
            self.disarm_prediction();
        }

        self.latest_batch = Some(batch);
        request
    }

    fn publish(&self, transition: Transition, view: &mut impl DashboardView) {
        if transition.previous != transition.current {
            tracing::info!(
                "Connection state {} -> {}",
                transition.previous,
                transition.current
            );
        }
        if let Some(waiting) = transition.standby {
            view.standby(waiting);
        }
        if let Some(notice) = transition.notice {
            view.notify(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_view::RecordingView;
    use crate::domain::connection::Notice;
    use crate::domain::viewport::Breakpoint;
    use tokio::time::{sleep_until, Duration, Instant};

    fn coordinator() -> IngestionCoordinator {
        IngestionCoordinator::new(&PlaybackSettings::default(), WindowCaps::default())
    }

    async fn play_for(
        coordinator: &mut IngestionCoordinator,
        view: &mut RecordingView,
        window: Duration,
    ) {
        let deadline = Instant::now() + window;
        loop {
            tokio::select! {
                channel = coordinator.next_tick() => coordinator.tick(channel, view),
                _ = sleep_until(deadline) => return,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_broadcast_plays_after_one_tick() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();

        coordinator.opened(&mut view);
        assert_eq!(coordinator.state(), ConnectionState::Idle);

        assert_eq!(coordinator.handle_frame("0:0", &mut view), None);
        assert_eq!(view.notices, vec![Notice::NoSignalYet]);
        assert_eq!(view.standby.last(), Some(&true));

        coordinator.handle_frame(r#"1:{"temp":[20.1]}"#, &mut view);
        assert_eq!(coordinator.state(), ConnectionState::Broadcasting);
        assert_eq!(view.standby.last(), Some(&false));
        assert_eq!(view.batches.len(), 1);
        assert_eq!(coordinator.queued(Channel::Temperature), 1);
        assert!(coordinator.is_playing(Channel::Temperature));
        assert!(!coordinator.is_playing(Channel::Ph));

        let started = Instant::now();
        let channel = coordinator.next_tick().await;
        let waited = Instant::now() - started;
        assert!(waited >= Duration::from_secs(1) && waited < Duration::from_millis(1_010));
        assert_eq!(channel, Channel::Temperature);

        coordinator.tick(channel, &mut view);
        let shown = coordinator.series(Channel::Temperature);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown.last().map(|p| p.amount), Some(20.1));
        assert_eq!(view.readouts, vec![(Channel::Temperature, 20.1)]);

        // Drained: playback parks until the next append
        assert!(!coordinator.is_playing(Channel::Temperature));
        coordinator.handle_frame(r#"1:{"temp":[20.2]}"#, &mut view);
        assert!(coordinator.is_playing(Channel::Temperature));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlog_plays_one_sample_per_second() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);

        let samples: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let frame = format!("1:{{\"ph\":[{}]}}", samples.join(","));
        coordinator.handle_frame(&frame, &mut view);

        play_for(&mut coordinator, &mut view, Duration::from_millis(10_500)).await;

        let popped: Vec<f64> = view.readouts.iter().map(|(_, v)| *v).collect();
        assert_eq!(popped, (0..10).map(f64::from).collect::<Vec<_>>());
        assert_eq!(coordinator.queued(Channel::Ph), 40);
        assert!(coordinator.is_playing(Channel::Ph));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_across_interleaved_frames_and_ticks() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);

        coordinator.handle_frame("1:1,2;;", &mut view);
        play_for(&mut coordinator, &mut view, Duration::from_millis(1_500)).await;
        coordinator.handle_frame(r#"1:{"temp":[3]}"#, &mut view);
        coordinator.handle_frame("1:4,5", &mut view);
        play_for(&mut coordinator, &mut view, Duration::from_secs(10)).await;

        let popped: Vec<f64> = view.readouts.iter().map(|(_, v)| *v).collect();
        assert_eq!(popped, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(!coordinator.is_playing(Channel::Temperature));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_follows_breakpoint_at_each_insert() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);

        let samples: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        coordinator.handle_frame(&format!("1:{}", samples.join(",")), &mut view);

        play_for(&mut coordinator, &mut view, Duration::from_millis(12_500)).await;
        assert_eq!(coordinator.series(Channel::Temperature).len(), 11);

        view.breakpoint = Breakpoint::Small;
        play_for(&mut coordinator, &mut view, Duration::from_secs(1)).await;
        assert_eq!(coordinator.series(Channel::Temperature).len(), 3);

        for (_, points) in &view.series {
            assert!(points.len() <= 11);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_play_independently() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);

        coordinator.handle_frame(r#"1:{"temp":[1,2,3],"orp":[650]}"#, &mut view);
        play_for(&mut coordinator, &mut view, Duration::from_millis(1_500)).await;

        assert_eq!(view.readouts.len(), 2);
        assert!(view.readouts.contains(&(Channel::Temperature, 1.0)));
        assert!(view.readouts.contains(&(Channel::Orp, 650.0)));
        assert!(!coordinator.is_playing(Channel::Orp));
        assert!(coordinator.is_playing(Channel::Temperature));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prediction_fires_once_per_connection() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);
        assert!(coordinator.is_prediction_armed());

        // A batch missing a channel cannot feed the model and keeps the gate armed
        assert_eq!(
            coordinator.handle_frame(r#"1:{"temp":[20.1]}"#, &mut view),
            None
        );
        assert!(coordinator.is_prediction_armed());

        let request = coordinator.handle_frame("1:21,22;7.2;650,651", &mut view);
        assert_eq!(
            request,
            Some(PredictionRequest {
                temp: 21.0,
                ph: 7.2,
                orp: 650.0
            })
        );
        assert!(!coordinator.is_prediction_armed());
        assert_eq!(coordinator.handle_frame("1:23;7.3;660", &mut view), None);

        assert_eq!(
            coordinator.manual_prediction(PredictionSource::LatestBatch),
            Some(PredictionRequest {
                temp: 23.0,
                ph: 7.3,
                orp: 660.0
            })
        );
        assert_eq!(
            coordinator.manual_prediction(PredictionSource::LatestReadout),
            None
        );

        play_for(&mut coordinator, &mut view, Duration::from_millis(1_500)).await;
        assert_eq!(
            coordinator.manual_prediction(PredictionSource::LatestReadout),
            Some(PredictionRequest {
                temp: 20.1,
                ph: 7.2,
                orp: 650.0
            })
        );

        coordinator.opened(&mut view);
        assert!(coordinator.is_prediction_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_frame_is_absorbed() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);
        coordinator.handle_frame("1:1;2;3", &mut view);

        assert_eq!(coordinator.handle_frame("0:???", &mut view), None);
        assert_eq!(coordinator.state(), ConnectionState::Idle);
        assert_eq!(view.notices, vec![Notice::UnreadableMessage]);
        assert_eq!(coordinator.queued(Channel::Ph), 1);

        coordinator.handle_frame("1:4;5;6", &mut view);
        assert_eq!(coordinator.state(), ConnectionState::Broadcasting);
        assert_eq!(coordinator.queued(Channel::Ph), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_lost_after_broadcast() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);

        coordinator.handle_frame("1:1;2;3", &mut view);
        coordinator.handle_frame("0:2", &mut view);
        assert_eq!(coordinator.state(), ConnectionState::Active);
        assert_eq!(view.notices, vec![Notice::SignalLost]);
        assert_eq!(view.standby, vec![true, false, true]);

        // The hub keeps reporting while the device stays quiet
        coordinator.handle_frame("0:2", &mut view);
        assert_eq!(coordinator.state(), ConnectionState::Active);
        assert_eq!(view.notices, vec![Notice::SignalLost, Notice::NoSignalYet]);
        assert_eq!(view.standby, vec![true, false, true, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_and_shutdown() {
        let mut coordinator = coordinator();
        let mut view = RecordingView::default();
        coordinator.opened(&mut view);
        coordinator.handle_frame("1:1;2;3", &mut view);

        coordinator.handle_closed(&mut view);
        assert_eq!(coordinator.state(), ConnectionState::Idle);
        assert_eq!(view.notices, vec![Notice::ConnectionClosed]);

        coordinator.shutdown();
        coordinator.shutdown();
        for channel in Channel::ALL {
            assert!(!coordinator.is_playing(channel));
        }

        coordinator.handle_transport_error("reset by peer", &mut view);
        assert_eq!(view.notices.last(), Some(&Notice::ConnectionError));
    }
}
