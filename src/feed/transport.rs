//! Transport seam of the live feed.
//!
//! The feed loop only needs to open a connection, send one text frame and
//! read frames until the connection ends. [`WsConnector`] does this over
//! tokio-tungstenite; tests plug in scripted connectors.

use crate::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

/// Something received on an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// Transport-level ping/pong
    Ping,
    /// The peer closed the connection
    Close,
}

/// Opens feed connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedConnection>>;
}

/// One open feed connection
#[async_trait]
pub trait FeedConnection: Send {
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Next inbound item; `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<Inbound>>;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedConnection>> {
        let (stream, response) = connect_async(url).await?;
        log::debug!("feed handshake completed with status {}", response.status());
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Inbound>> {
        let message = self.stream.next().await?;
        Some(message.map_err(Error::from).map(|message| match message {
            Message::Text(text) => Inbound::Text(text),
            Message::Binary(bytes) => Inbound::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Inbound::Ping,
            Message::Close(_) => Inbound::Close,
        }))
    }
}
