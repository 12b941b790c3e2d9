// Domain layer - Pure telemetry and connection models
pub mod connection;
pub mod telemetry;
pub mod viewport;
