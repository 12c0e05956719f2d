//! In-memory map surface for headless use and tests.

use crate::core::geo::{LatLng, LatLngBounds};
use crate::traits::MapSurface;
use crate::ui::style::{MarkerStyle, TrackStyle};

/// Handle of a marker on a [`HeadlessSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMarker {
    pub position: LatLng,
    pub title: String,
    pub style: MarkerStyle,
    pub popup_html: String,
    pub popup_open: bool,
}

/// Keeps the state a real map would display, and logs every change.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    markers: Vec<HeadlessMarker>,
    updates: usize,
    fits: Vec<LatLngBounds>,
    polylines: Vec<Vec<LatLng>>,
    points: Vec<(LatLng, Option<String>)>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&HeadlessMarker> {
        self.markers.get(id.0)
    }

    pub fn markers(&self) -> &[HeadlessMarker] {
        &self.markers
    }

    /// Number of `update_marker` calls so far
    pub fn update_count(&self) -> usize {
        self.updates
    }

    pub fn open_popups(&self) -> Vec<MarkerId> {
        self.markers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.popup_open)
            .map(|(i, _)| MarkerId(i))
            .collect()
    }

    pub fn fit_count(&self) -> usize {
        self.fits.len()
    }

    pub fn last_fit(&self) -> Option<&LatLngBounds> {
        self.fits.last()
    }

    pub fn polylines(&self) -> &[Vec<LatLng>] {
        &self.polylines
    }

    pub fn points(&self) -> &[(LatLng, Option<String>)] {
        &self.points
    }

    fn marker_mut(&mut self, id: &MarkerId) -> Option<&mut HeadlessMarker> {
        let marker = self.markers.get_mut(id.0);
        if marker.is_none() {
            log::warn!("unknown marker {:?}", id);
        }
        marker
    }
}

impl MapSurface for HeadlessSurface {
    type Marker = MarkerId;

    fn create_marker(&mut self, position: LatLng, style: &MarkerStyle, title: &str) -> MarkerId {
        self.markers.push(HeadlessMarker {
            position,
            title: title.to_string(),
            style: style.clone(),
            popup_html: String::new(),
            popup_open: false,
        });
        let id = MarkerId(self.markers.len() - 1);
        log::info!("marker {} created at {:.5}, {:.5}: {}", id.0, position.lat, position.lng, title);
        id
    }

    fn update_marker(&mut self, marker: &MarkerId, position: LatLng, title: &str) {
        self.updates += 1;
        if let Some(m) = self.marker_mut(marker) {
            m.position = position;
            m.title = title.to_string();
            log::info!("marker {} moved to {:.5}, {:.5}: {}", marker.0, position.lat, position.lng, title);
        }
    }

    fn set_popup_content(&mut self, marker: &MarkerId, html: &str) {
        if let Some(m) = self.marker_mut(marker) {
            m.popup_html = html.to_string();
        }
    }

    fn open_popup(&mut self, marker: &MarkerId, html: &str) {
        if let Some(m) = self.marker_mut(marker) {
            m.popup_html = html.to_string();
            m.popup_open = true;
            log::debug!("popup {} opened", marker.0);
        }
    }

    fn close_popup(&mut self, marker: &MarkerId) {
        if let Some(m) = self.marker_mut(marker) {
            m.popup_open = false;
        }
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        let center = bounds.center();
        log::info!(
            "fit view to SW({:.5}, {:.5}) - NE({:.5}, {:.5}), center {:.5}, {:.5}",
            bounds.south_west.lat,
            bounds.south_west.lng,
            bounds.north_east.lat,
            bounds.north_east.lng,
            center.lat,
            center.lng
        );
        self.fits.push(bounds.clone());
    }

    fn add_point(&mut self, position: LatLng, _style: &MarkerStyle, popup: Option<&str>) {
        self.points.push((position, popup.map(str::to_string)));
    }

    fn add_polyline(&mut self, path: &[LatLng], _style: &TrackStyle) {
        self.polylines.push(path.to_vec());
    }
}
