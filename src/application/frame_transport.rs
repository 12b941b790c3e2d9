// Ports for the persistent relay connection and the session it belongs to
use async_trait::async_trait;

/// What the duplex connection can report to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

#[async_trait]
pub trait FrameTransport: Send {
    /// Next inbound event. `None` once the connection is gone. Must be cancel-safe.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Closes the connection from our side. Safe to call on a closed connection.
    async fn close(&mut self);
}

#[async_trait]
pub trait SessionTeardown: Send + Sync {
    /// Ends the server-side working session
    async fn logoff(&self) -> anyhow::Result<()>;
}
