//! # WebSocket Transport
//!
//! [`Connector`] over tokio-tungstenite. Frames are JSON text messages
//! `{"event": ..., "data": ...}`; credentials travel in the upgrade request
//! headers.

use crate::error::{RealtimeError, Result};
use crate::transport::{Connector, Credentials, Link, LinkEvent};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use shared::dto::realtime::EventFrame;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

pub const ROLE_HEADER: &str = "x-client-role";
pub const USER_ID_HEADER: &str = "x-user-id";

pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn header(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| RealtimeError::Handshake(format!("invalid header value: {}", e)))
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Link>> {
        let mut request = self.url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, header(&format!("Bearer {}", credentials.token))?);
        headers.insert(ROLE_HEADER, header(&credentials.role.to_string())?);
        headers.insert(USER_ID_HEADER, header(&credentials.user_id)?);

        let (stream, response) = connect_async(request).await?;
        info!(
            url = %self.url,
            status = ?response.status(),
            user_id = %credentials.user_id,
            "WebSocket connection established"
        );

        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, frame: EventFrame) -> Result<()> {
        let text = serde_json::to_string(&frame)?;
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> LinkEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<EventFrame>(&text) {
                    Ok(frame) => {
                        trace!(event = %frame.event, "Received realtime frame");
                        return LinkEvent::Frame(frame);
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            message_length = text.len(),
                            "Failed to parse realtime frame, ignoring"
                        );
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    trace!(data_len = data.len(), "Received ping, sending pong");
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        return LinkEvent::Lost(Some(e.to_string()));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(
                        code = ?frame.as_ref().map(|f| f.code),
                        reason = ?frame.as_ref().map(|f| f.reason.to_string()),
                        "WebSocket connection closed by server"
                    );
                    return LinkEvent::ServerClosed;
                }
                Some(Ok(_)) => {
                    trace!("Received other WebSocket message type");
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read error");
                    return LinkEvent::Lost(Some(e.to_string()));
                }
                None => return LinkEvent::Lost(None),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::dto::chat::SenderType;

    #[tokio::test]
    async fn test_invalid_url_is_handshake_error() {
        let connector = WsConnector::new("not a url");
        let result = connector
            .connect(&Credentials::new("t", SenderType::User, "u1"))
            .await;

        assert!(matches!(result, Err(RealtimeError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_control_characters_in_token_rejected() {
        let connector = WsConnector::new("ws://127.0.0.1:9/socket");
        let result = connector
            .connect(&Credentials::new("bad\ntoken", SenderType::Agent, "a1"))
            .await;

        assert!(matches!(result, Err(RealtimeError::Handshake(e)) if e.contains("header")));
    }
}
