// Application layer - Ingestion, playback and session orchestration
pub mod dashboard_session;
pub mod dashboard_view;
pub mod frame_transport;
pub mod ingestion_coordinator;
pub mod playback_scheduler;
pub mod prediction_client;
pub mod sample_queue;
pub mod windowed_series;
