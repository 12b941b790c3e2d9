// Websocket connection to the metrics relay
use crate::application::frame_transport::{FrameTransport, TransportEvent};
use crate::infrastructure::config::ServerSettings;
use async_trait::async_trait;
use futures::stream::{SplitSink, Stream};
use futures::{SinkExt, StreamExt};
use std::pin::Pin;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, COOKIE};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid socket request: {0}")]
    InvalidRequest(String),
    #[error("websocket connection failed: {0}")]
    Connect(#[from] WsError),
}

pub struct WsTransport {
    sink: SplitSink<WsStream, Message>,
    events: Pin<Box<dyn Stream<Item = TransportEvent> + Send>>,
    closed: bool,
}

impl WsTransport {
    /// Opens the dashboard socket, forwarding the session cookie when configured
    pub async fn connect(server: &ServerSettings) -> Result<Self, TransportError> {
        let url = server.socket_url();
        let mut request = url.as_str().into_client_request()?;

        if let Some(cookie) = &server.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (stream, response) = connect_async(request).await?;
        tracing::info!("Connected to {} (status {})", url, response.status());

        let (sink, source) = stream.split();
        Ok(Self {
            sink,
            events: Box::pin(transport_events(source)),
            closed: false,
        })
    }
}

/// Maps raw websocket messages to transport events. Ends after the first close or error.
fn transport_events<S>(mut source: S) -> impl Stream<Item = TransportEvent>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    async_stream::stream! {
        while let Some(item) = source.next().await {
            match item {
                Ok(Message::Text(text)) => {
                    yield TransportEvent::Frame(text);
                }
                Ok(Message::Binary(bytes)) => {
                    yield TransportEvent::Frame(String::from_utf8_lossy(&bytes).into_owned());
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    yield TransportEvent::Closed { code, reason };
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    yield TransportEvent::Error(e.to_string());
                    return;
                }
            }
        }

        yield TransportEvent::Closed { code: None, reason: String::new() };
    }
}

#[async_trait]
impl FrameTransport for WsTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.next().await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.sink.send(Message::Close(None)).await {
            tracing::debug!("Socket already closed: {}", e);
        }
        if let Err(e) = self.sink.close().await {
            tracing::debug!("Closing socket sink: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    async fn collect(messages: Vec<Result<Message, WsError>>) -> Vec<TransportEvent> {
        transport_events(stream::iter(messages)).collect().await
    }

    #[tokio::test]
    async fn test_text_frames_then_close() {
        let events = collect(vec![
            Ok(Message::Text("0:1".to_string())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Text("1:1;2;3".to_string())),
            Ok(Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "bye".into(),
            }))),
            Ok(Message::Text("ignored".to_string())),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                TransportEvent::Frame("0:1".to_string()),
                TransportEvent::Frame("1:1;2;3".to_string()),
                TransportEvent::Closed {
                    code: Some(1001),
                    reason: "bye".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let events = collect(vec![
            Ok(Message::Text("0:1".to_string())),
            Err(WsError::ConnectionClosed),
        ])
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], TransportEvent::Error(_)));
    }

    #[tokio::test]
    async fn test_end_of_stream_is_a_close() {
        let events = collect(vec![]).await;
        assert_eq!(
            events,
            vec![TransportEvent::Closed {
                code: None,
                reason: String::new()
            }]
        );
    }
}
