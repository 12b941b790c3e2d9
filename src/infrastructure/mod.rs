// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod frame_decoder;
pub mod relay_http_client;
pub mod ws_transport;
