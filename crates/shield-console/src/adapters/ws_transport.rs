//! WebSocket Feed Adapter
//!
//! Implements `FeedTransport` over tokio-tungstenite. Text frames are
//! delivered as-is; pings are answered; a close frame ends the channel.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::domain::ConsoleError;
use crate::ports::outbound::{FeedChannel, FeedTransport};

/// WebSocket transport for the live feed.
#[derive(Clone, Debug, Default)]
pub struct WsFeedTransport;

impl WsFeedTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeedTransport for WsFeedTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedChannel>, ConsoleError> {
        debug!("[shield] Opening live feed {}", url);
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ConsoleError::Transport(format!("connect {url}: {e}")))?;
        Ok(Box::new(WsFeedChannel { stream }))
    }
}

struct WsFeedChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedChannel for WsFeedChannel {
    async fn next_frame(&mut self) -> Option<Result<String, ConsoleError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("[shield] Dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        return Some(Err(ConsoleError::Transport(e.to_string())));
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!("[shield] Live feed closed by peer: {:?}", frame);
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(ConsoleError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("[shield] Close handshake failed: {}", e);
        }
    }
}
