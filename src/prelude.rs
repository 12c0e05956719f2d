//! Prelude module for common livemap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use livemap::prelude::*;`

pub use crate::core::{
    config::{LocationQuery, ViewerConfig},
    geo::{LatLng, LatLngBounds, LngUnwrapper},
};

pub use crate::data::{
    frame::InboundFrame,
    geojson::{GeoJson, GeoJsonFeature, GeoJsonGeometry, TrackFeature, TrackLayer, TrackShape},
    location::{DeviceKey, LocationUpdate},
};

pub use crate::feed::{
    ConnectionState, Connector, FeedClient, FeedConnection, Inbound, LogStatus, WsConnector,
};

pub use crate::api::ApiClient;

pub use crate::layers::{
    marker::Marker,
    reconciler::{MapSession, UpsertOutcome},
};

pub use crate::live::LiveMap;

pub use crate::traits::{MapSurface, PopupRenderer, StatusDisplay};

pub use crate::ui::{HeadlessSurface, HtmlPopup, MarkerStyle, TrackStyle};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::{Error as MapError, Result};

pub use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
