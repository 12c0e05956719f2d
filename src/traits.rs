//! Shared trait abstractions for the collaborators around the core
//!
//! The core never talks to a concrete mapping library, DOM or status bar.
//! Each of those sits behind one of the traits below.

use crate::core::geo::{LatLng, LatLngBounds};
use crate::data::location::LocationUpdate;
use crate::feed::client::ConnectionState;
use crate::ui::style::{MarkerStyle, TrackStyle};

/// Trait for the map rendering surface (Google Maps, Leaflet, egui, headless...)
///
/// Marker handles are opaque to the core; the surface decides what they are.
pub trait MapSurface {
    type Marker;

    /// Create a marker at `position`. Its popup starts closed.
    fn create_marker(&mut self, position: LatLng, style: &MarkerStyle, title: &str) -> Self::Marker;

    /// Move an existing marker and change its title
    fn update_marker(&mut self, marker: &Self::Marker, position: LatLng, title: &str);

    /// Replace popup content without touching its open/closed state
    fn set_popup_content(&mut self, marker: &Self::Marker, html: &str);

    fn open_popup(&mut self, marker: &Self::Marker, html: &str);

    fn close_popup(&mut self, marker: &Self::Marker);

    /// Center on `bounds.center()` and zoom so that `bounds` is visible
    fn fit_bounds(&mut self, bounds: &LatLngBounds);

    /// Draw a track point; surfaces without track support ignore it
    fn add_point(&mut self, _position: LatLng, _style: &MarkerStyle, _popup: Option<&str>) {}

    /// Draw a polyline; surfaces without track support ignore it
    fn add_polyline(&mut self, _path: &[LatLng], _style: &TrackStyle) {}

    /// Draw a polygon, exterior ring first
    fn add_polygon(&mut self, rings: &[Vec<LatLng>], style: &TrackStyle) {
        for ring in rings {
            self.add_polyline(ring, style);
        }
    }
}

/// Trait for turning a location update into marker text
pub trait PopupRenderer {
    /// Short one-line title, used as the marker tooltip
    fn title(&self, update: &LocationUpdate) -> String;

    /// Popup body (HTML)
    fn html(&self, update: &LocationUpdate) -> String;
}

/// Trait for the connection status display
///
/// Called from the feed task, hence `Send + Sync`.
pub trait StatusDisplay: Send + Sync {
    fn connection_changed(&self, state: ConnectionState);

    /// Status text pushed by the recorder in `_label` frames
    fn label(&self, text: &str);
}
