// Port for the presentation layer fed by the ingestion pipeline
use crate::application::prediction_client::Prediction;
use crate::application::windowed_series::WindowedSeries;
use crate::domain::connection::Notice;
use crate::domain::telemetry::{Channel, MetricsBatch};
use crate::domain::viewport::Breakpoint;

/// Callbacks registered by the presentation layer.
///
/// All calls happen on the session loop, so implementations need no locking.
pub trait DashboardView {
    /// Once per inbound metrics frame, before any of it is displayed
    fn stream_metrics(&mut self, batch: &MetricsBatch);

    /// On every connection state transition; true while waiting for data
    fn standby(&mut self, waiting: bool);

    /// Once per channel per playback tick that displayed a value
    fn last_data_received(&mut self, channel: Channel, value: f64);

    /// After a displayed point was inserted into a channel's chart window
    fn series_updated(&mut self, _channel: Channel, _series: &WindowedSeries) {}

    fn notify(&mut self, notice: Notice);

    fn prediction_ready(&mut self, _prediction: &Prediction) {}

    /// Current viewport size class, read at every chart insert
    fn breakpoint(&self) -> Breakpoint {
        Breakpoint::default()
    }

    fn set_breakpoint(&mut self, _breakpoint: Breakpoint) {}

    /// The user dismissed the visible alert
    fn acknowledge_alert(&mut self) {}
}

/// Records every callback; shared by the pipeline tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingView {
    pub batches: Vec<MetricsBatch>,
    pub standby: Vec<bool>,
    pub readouts: Vec<(Channel, f64)>,
    pub series: Vec<(Channel, Vec<crate::domain::telemetry::DisplayedPoint>)>,
    pub notices: Vec<Notice>,
    pub predictions: Vec<Prediction>,
    pub breakpoint: Breakpoint,
}

#[cfg(test)]
impl DashboardView for RecordingView {
    fn stream_metrics(&mut self, batch: &MetricsBatch) {
        self.batches.push(batch.clone());
    }

    fn standby(&mut self, waiting: bool) {
        self.standby.push(waiting);
    }

    fn last_data_received(&mut self, channel: Channel, value: f64) {
        self.readouts.push((channel, value));
    }

    fn series_updated(&mut self, channel: Channel, series: &WindowedSeries) {
        self.series.push((channel, series.to_vec()));
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn prediction_ready(&mut self, prediction: &Prediction) {
        self.predictions.push(prediction.clone());
    }

    fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.breakpoint = breakpoint;
    }
}
