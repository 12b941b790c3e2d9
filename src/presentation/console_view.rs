// Console dashboard - logs readouts and charts, owns the alert dialog
use crate::application::dashboard_session::SessionCommand;
use crate::application::dashboard_view::DashboardView;
use crate::application::prediction_client::Prediction;
use crate::application::windowed_series::WindowedSeries;
use crate::domain::connection::Notice;
use crate::domain::telemetry::{Channel, MetricsBatch};
use crate::domain::viewport::Breakpoint;
use crate::presentation::alert::{AlertDialog, AlertHandler};
use tokio::sync::mpsc::UnboundedSender;

pub struct ConsoleView {
    alert: AlertDialog,
    breakpoint: Breakpoint,
    readouts: [Option<f64>; 3],
    waiting: bool,
    commands: UnboundedSender<SessionCommand>,
}

impl ConsoleView {
    pub fn new(breakpoint: Breakpoint, commands: UnboundedSender<SessionCommand>) -> Self {
        Self {
            alert: AlertDialog::new(),
            breakpoint,
            readouts: [None; 3],
            waiting: false,
            commands,
        }
    }

    #[cfg(test)]
    pub fn alert(&self) -> &AlertDialog {
        &self.alert
    }

    #[cfg(test)]
    pub fn readout(&self, channel: Channel) -> Option<f64> {
        self.readouts[channel.index()]
    }

    #[cfg(test)]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    fn logoff_on_acknowledge(&self) -> AlertHandler {
        let commands = self.commands.clone();
        Box::new(move || {
            let _ = commands.send(SessionCommand::Logoff);
        })
    }
}

impl DashboardView for ConsoleView {
    fn stream_metrics(&mut self, batch: &MetricsBatch) {
        tracing::debug!("Received {} samples", batch.len());
    }

    fn standby(&mut self, waiting: bool) {
        if waiting != self.waiting {
            if waiting {
                tracing::info!("Waiting for metrics from the micro-controller");
            } else {
                tracing::info!("Metrics are streaming");
            }
        }
        self.waiting = waiting;
    }

    fn last_data_received(&mut self, channel: Channel, value: f64) {
        match self.readouts[channel.index()].replace(value) {
            Some(previous) => tracing::info!(
                "{}: {} {} ({:+.2})",
                channel.title(),
                value,
                channel.unit(),
                value - previous
            ),
            None => tracing::info!("{}: {} {}", channel.title(), value, channel.unit()),
        }
    }

    fn series_updated(&mut self, channel: Channel, series: &WindowedSeries) {
        let Some(latest) = series.last() else {
            return;
        };
        let amounts: Vec<String> = series.points().map(|p| p.amount.to_string()).collect();
        tracing::debug!(
            "{} chart, {} points up to {}: [{}]",
            channel,
            series.len(),
            latest.time,
            amounts.join(", ")
        );
    }

    fn notify(&mut self, notice: Notice) {
        let handler = if notice.ends_session() {
            Some(self.logoff_on_acknowledge())
        } else {
            None
        };
        self.alert.show(notice.title(), &notice.body(), handler);

        if let Some(alert) = self.alert.current() {
            tracing::warn!("{}: {}", alert.title, alert.body);
        }
    }

    fn prediction_ready(&mut self, prediction: &Prediction) {
        tracing::info!(
            "Predicted water quality: {}, chlorine: {}",
            prediction.water_quality,
            prediction.chlorine
        );
    }

    fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        tracing::info!("Viewport set to {:?}", breakpoint);
        self.breakpoint = breakpoint;
    }

    fn acknowledge_alert(&mut self) {
        if !self.alert.acknowledge() {
            tracing::debug!("No alert to acknowledge");
        }
    }
}
