//! # livemap
//!
//! Core of a live location viewer for an OwnTracks recorder.
//!
//! A reconnecting WebSocket client receives location updates, and a map
//! session keeps exactly one marker per device on whatever map surface the
//! embedder provides. Historical tracks can be fetched over the recorder's
//! REST API and drawn with antimeridian-safe longitudes.

pub mod api;
pub mod core;
pub mod data;
pub mod feed;
pub mod layers;
pub mod live;
pub mod prelude;
pub mod runtime;
pub mod traits;
pub mod ui;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::{LocationQuery, ViewerConfig},
    geo::{LatLng, LatLngBounds, LngUnwrapper},
};

pub use data::{
    frame::InboundFrame,
    geojson::{GeoJson, TrackLayer},
    location::{DeviceKey, LocationUpdate},
};

pub use feed::{ConnectionState, FeedClient};

pub use api::ApiClient;

pub use layers::{
    marker::Marker,
    reconciler::{MapSession, UpsertOutcome},
};

pub use live::LiveMap;

pub use traits::{MapSurface, PopupRenderer, StatusDisplay};

pub use ui::{HeadlessSurface, HtmlPopup, MarkerStyle, TrackStyle};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Location update has no topic")]
    MissingTopic,

    #[error("{0}")]
    ApiUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger`, honouring `RUST_LOG`. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
