// Dashboard session - the single event loop driving ingestion and playback
use crate::application::dashboard_view::DashboardView;
use crate::application::frame_transport::{FrameTransport, SessionTeardown, TransportEvent};
use crate::application::ingestion_coordinator::{IngestionCoordinator, PredictionSource};
use crate::application::prediction_client::{
    Prediction, PredictionClient, PredictionError, PredictionRequest,
};
use crate::domain::connection::Notice;
use crate::domain::viewport::Breakpoint;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Requests coming from the user, or from acknowledged alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Acknowledge,
    Predict(PredictionSource),
    Viewport(Breakpoint),
    Logoff,
}

type PredictionResult = Result<Prediction, PredictionError>;

pub struct DashboardSession<T, V> {
    coordinator: IngestionCoordinator,
    transport: T,
    view: V,
    predictions: Arc<dyn PredictionClient>,
    teardown: Arc<dyn SessionTeardown>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    results_tx: mpsc::UnboundedSender<PredictionResult>,
    results_rx: mpsc::UnboundedReceiver<PredictionResult>,
}

impl<T, V> DashboardSession<T, V>
where
    T: FrameTransport,
    V: DashboardView,
{
    pub fn new(
        coordinator: IngestionCoordinator,
        transport: T,
        view: V,
        predictions: Arc<dyn PredictionClient>,
        teardown: Arc<dyn SessionTeardown>,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            coordinator,
            transport,
            view,
            predictions,
            teardown,
            commands,
            results_tx,
            results_rx,
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        &self.view
    }

    #[cfg(test)]
    pub fn coordinator(&self) -> &IngestionCoordinator {
        &self.coordinator
    }

    /// Runs until the session is torn down.
    ///
    /// Frames, playback ticks, prediction results and user commands are all handled on
    /// this one loop; prediction requests run on their own tasks so ingestion never
    /// waits on them.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.coordinator.opened(&mut self.view);
        let mut connected = true;

        loop {
            tokio::select! {
                event = self.transport.next_event(), if connected => {
                    connected = self.handle_transport(event);
                }
                channel = self.coordinator.next_tick() => {
                    self.coordinator.tick(channel, &mut self.view);
                }
                Some(result) = self.results_rx.recv() => {
                    self.prediction_finished(result);
                }
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Logoff) | None => break,
                    Some(command) => self.apply(command),
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Returns whether the connection is still open
    fn handle_transport(&mut self, event: Option<TransportEvent>) -> bool {
        match event {
            Some(TransportEvent::Frame(text)) => {
                if let Some(request) = self.coordinator.handle_frame(&text, &mut self.view) {
                    self.request_prediction(request);
                }
                true
            }
            Some(TransportEvent::Closed { code, reason }) => {
                tracing::info!("Socket closed with code {:?}: {}", code, reason);
                self.coordinator.handle_closed(&mut self.view);
                false
            }
            Some(TransportEvent::Error(error)) => {
                self.coordinator.handle_transport_error(&error, &mut self.view);
                false
            }
            None => {
                self.coordinator.handle_closed(&mut self.view);
                false
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Acknowledge => self.view.acknowledge_alert(),
            SessionCommand::Viewport(breakpoint) => self.view.set_breakpoint(breakpoint),
            SessionCommand::Predict(source) => match self.coordinator.manual_prediction(source) {
                Some(request) => self.request_prediction(request),
                None => tracing::info!("No readings for every channel yet, prediction skipped"),
            },
            SessionCommand::Logoff => {}
        }
    }

    fn request_prediction(&self, request: PredictionRequest) {
        let client = self.predictions.clone();
        let results = self.results_tx.clone();
        tracing::debug!("Requesting prediction for {:?}", request);

        tokio::spawn(async move {
            let result = client.predict(&request).await;
            let _ = results.send(result);
        });
    }

    fn prediction_finished(&mut self, result: PredictionResult) {
        match result {
            Ok(prediction) => {
                tracing::info!(
                    "Prediction: water quality {}, chlorine {}",
                    prediction.water_quality,
                    prediction.chlorine
                );
                self.view.prediction_ready(&prediction);
            }
            Err(e) => {
                tracing::warn!("Prediction request failed: {}", e);
                let notice = if e.ends_session() {
                    Notice::SessionExpired
                } else {
                    Notice::PredictionFailed(e.to_string())
                };
                self.view.notify(notice);
            }
        }
    }

    async fn shutdown(&mut self) {
        tracing::info!(
            "Tearing down dashboard session (connection {})",
            self.coordinator.state()
        );
        self.coordinator.shutdown();
        self.transport.close().await;
        if let Err(e) = self.teardown.logoff().await {
            tracing::warn!("Logoff failed: {:#}", e);
        }
    }
}
