//! Live feed of location updates from the recorder's WebSocket

pub mod client;
pub mod status;
pub mod transport;

pub use client::{ConnectionState, FeedClient};
pub use status::LogStatus;
pub use transport::{Connector, FeedConnection, Inbound, WsConnector};
