//! Marker reconciliation
//!
//! A [`MapSession`] keeps exactly one marker per device on a map surface.
//! Every location update either creates the device's marker or moves the
//! existing one in place; handles and popups are never recreated, so click
//! handlers and popup state attached by the surface survive updates.
//!
//! Two policies can be switched on:
//!
//! * singular markers: after every update, and on every marker click, all
//!   other popups are closed and only the touched marker's popup is open;
//! * auto-fit: after every update the view is fitted to all markers.
//!   Switching auto-fit on fits once immediately.

use crate::core::config::ViewerConfig;
use crate::core::geo::LatLngBounds;
use crate::data::location::{DeviceKey, LocationUpdate};
use crate::layers::marker::Marker;
use crate::prelude::HashMap;
use crate::traits::{MapSurface, PopupRenderer};
use crate::ui::popup::HtmlPopup;
use crate::ui::style::MarkerStyle;
use crate::Result;

/// What [`MapSession::upsert`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(DeviceKey),
    Updated(DeviceKey),
}

impl UpsertOutcome {
    pub fn key(&self) -> &DeviceKey {
        match self {
            Self::Created(key) | Self::Updated(key) => key,
        }
    }
}

/// Per-map state: the surface, its markers and the view policies.
pub struct MapSession<S: MapSurface> {
    surface: S,
    markers: HashMap<DeviceKey, Marker<S::Marker>>,
    renderer: Box<dyn PopupRenderer>,
    marker_style: MarkerStyle,
    singular_markers: bool,
    auto_fit: bool,
}

impl<S: MapSurface> MapSession<S> {
    /// Session with the default popup renderer, singular markers on and
    /// auto-fit off.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            markers: HashMap::default(),
            renderer: Box::new(HtmlPopup::new()),
            marker_style: MarkerStyle::default(),
            singular_markers: true,
            auto_fit: false,
        }
    }

    pub fn from_config(surface: S, config: &ViewerConfig) -> Self {
        Self {
            surface,
            markers: HashMap::default(),
            renderer: Box::new(HtmlPopup::with_renames(config.renames.clone())),
            marker_style: config.marker_style.clone(),
            singular_markers: config.singular_markers,
            auto_fit: config.auto_fit,
        }
    }

    pub fn with_renderer<R: PopupRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_marker_style(mut self, style: MarkerStyle) -> Self {
        self.marker_style = style;
        self
    }

    pub fn with_singular_markers(mut self, enabled: bool) -> Self {
        self.singular_markers = enabled;
        self
    }

    /// Sets auto-fit without triggering a fit; use [`Self::set_auto_fit`] for
    /// the interactive toggle.
    pub fn with_auto_fit(mut self, enabled: bool) -> Self {
        self.auto_fit = enabled;
        self
    }

    /// Brings the device's marker in line with `update`.
    pub fn upsert(&mut self, update: &LocationUpdate) -> Result<UpsertOutcome> {
        let key = update.device_key()?;
        let position = update.position();
        let title = self.renderer.title(update);
        let html = self.renderer.html(update);

        let outcome = if let Some(marker) = self.markers.get_mut(&key) {
            log::debug!("UPD {}: {:?}", key, update);
            self.surface.update_marker(marker.handle(), position, &title);
            self.surface.set_popup_content(marker.handle(), &html);
            marker.set_position(position, title);
            marker.set_popup_html(html);
            UpsertOutcome::Updated(key)
        } else {
            log::info!("NEW {}: {:?}", key, update);
            let handle = self.surface.create_marker(position, &self.marker_style, &title);
            self.surface.set_popup_content(&handle, &html);
            self.markers
                .insert(key.clone(), Marker::new(handle, position, title, html));
            UpsertOutcome::Created(key)
        };

        if self.singular_markers {
            self.open_singular(outcome.key());
        }

        if self.auto_fit {
            self.fit_to_markers();
        }

        Ok(outcome)
    }

    /// Applies updates in order, logging and skipping the ones that fail.
    /// Returns how many were applied.
    pub fn upsert_all<'a, I>(&mut self, updates: I) -> usize
    where
        I: IntoIterator<Item = &'a LocationUpdate>,
    {
        let mut applied = 0;
        for update in updates {
            match self.upsert(update) {
                Ok(_) => applied += 1,
                Err(e) => log::warn!("skipping location update: {}", e),
            }
        }
        applied
    }

    /// Click handler for a marker: opens its popup, closing the others first
    /// in singular mode. Returns `false` for unknown keys.
    pub fn on_marker_click(&mut self, key: &DeviceKey) -> bool {
        if !self.markers.contains_key(key) {
            return false;
        }

        if self.singular_markers {
            self.open_singular(key);
        } else if let Some(marker) = self.markers.get_mut(key) {
            self.surface.open_popup(marker.handle(), marker.popup_html());
            marker.set_popup_open(true);
        }
        true
    }

    /// To be called when the user closes a popup on the surface.
    pub fn on_popup_closed(&mut self, key: &DeviceKey) {
        if let Some(marker) = self.markers.get_mut(key) {
            marker.set_popup_open(false);
        }
    }

    /// Toggles auto-fit the way the map's "Autozoom" control does: switching
    /// it on fits the view once right away.
    pub fn set_auto_fit(&mut self, enabled: bool) {
        self.auto_fit = enabled;
        if enabled {
            self.fit_to_markers();
        }
    }

    pub fn toggle_auto_fit(&mut self) -> bool {
        self.set_auto_fit(!self.auto_fit);
        self.auto_fit
    }

    pub fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    pub fn singular_markers(&self) -> bool {
        self.singular_markers
    }

    /// Fits the view to all markers. Does nothing without markers.
    pub fn fit_to_markers(&mut self) -> bool {
        match self.bounds() {
            Some(bounds) => {
                self.surface.fit_bounds(&bounds);
                true
            }
            None => {
                log::debug!("no markers to fit");
                false
            }
        }
    }

    /// Smallest bounds containing every marker
    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.markers.values().map(|m| m.position()))
    }

    pub fn marker(&self, key: &DeviceKey) -> Option<&Marker<S::Marker>> {
        self.markers.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DeviceKey> {
        self.markers.keys()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Keys whose popup is currently open
    pub fn open_popups(&self) -> Vec<&DeviceKey> {
        self.markers
            .iter()
            .filter(|(_, m)| m.is_popup_open())
            .map(|(k, _)| k)
            .collect()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn open_singular(&mut self, key: &DeviceKey) {
        for (other_key, marker) in self.markers.iter_mut() {
            if other_key != key {
                self.surface.close_popup(marker.handle());
                marker.set_popup_open(false);
            }
        }

        if let Some(marker) = self.markers.get_mut(key) {
            self.surface.open_popup(marker.handle(), marker.popup_html());
            marker.set_popup_open(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::ui::surface::{HeadlessSurface, MarkerId};

    fn update(topic: &str, lat: f64, lon: f64) -> LocationUpdate {
        LocationUpdate::new(topic, lat, lon)
    }

    fn key(owner: &str, device: &str) -> DeviceKey {
        DeviceKey::new(owner, device)
    }

    #[test]
    fn test_repeated_updates_keep_one_marker() {
        let mut session = MapSession::new(HeadlessSurface::new());

        for i in 0..10 {
            let outcome = session
                .upsert(&update("owntracks/jane/phone", 50.0 + i as f64, 8.0))
                .unwrap();
            if i == 0 {
                assert_eq!(outcome, UpsertOutcome::Created(key("jane", "phone")));
            } else {
                assert_eq!(outcome, UpsertOutcome::Updated(key("jane", "phone")));
            }
        }

        assert_eq!(session.len(), 1);
        let marker = session.marker(&key("jane", "phone")).unwrap();
        assert_eq!(marker.position(), LatLng::new(59.0, 8.0));
        assert_eq!(session.surface().markers().len(), 1);
        assert_eq!(session.surface().update_count(), 9);
        assert_eq!(*marker.handle(), MarkerId(0));
    }

    #[test]
    fn test_distinct_devices_get_distinct_markers() {
        let mut session = MapSession::new(HeadlessSurface::new());
        session.upsert(&update("owntracks/jane/phone", 1.0, 1.0)).unwrap();
        session.upsert(&update("owntracks/bob/phone", 2.0, 2.0)).unwrap();
        session.upsert(&update("/owntracks/jane/tablet", 3.0, 3.0)).unwrap();
        session.upsert(&update("/owntracks/jane/phone", 4.0, 4.0)).unwrap();

        assert_eq!(session.len(), 3);
        assert_eq!(session.marker(&key("jane", "phone")).unwrap().position(), LatLng::new(4.0, 4.0));
        assert_eq!(session.marker(&key("bob", "phone")).unwrap().position(), LatLng::new(2.0, 2.0));
        assert_eq!(session.marker(&key("jane", "tablet")).unwrap().position(), LatLng::new(3.0, 3.0));
    }

    #[test]
    fn test_singular_mode_opens_latest_only() {
        let mut session = MapSession::new(HeadlessSurface::new());
        let updates = [
            update("owntracks/a/x", 1.0, 1.0),
            update("owntracks/b/x", 2.0, 2.0),
            update("owntracks/c/x", 3.0, 3.0),
            update("owntracks/a/x", 1.5, 1.5),
            update("owntracks/b/x", 2.5, 2.5),
        ];

        for u in &updates {
            let outcome = session.upsert(u).unwrap();
            assert_eq!(session.open_popups(), vec![outcome.key()]);
            assert_eq!(session.surface().open_popups().len(), 1);
        }

        let open = session.surface().open_popups()[0];
        let b = session.marker(&key("b", "x")).unwrap();
        assert_eq!(open, *b.handle());
        assert_eq!(session.surface().marker(open).unwrap().popup_html, b.popup_html());
    }

    #[test]
    fn test_click_in_singular_mode_closes_others() {
        let mut session = MapSession::new(HeadlessSurface::new());
        session.upsert(&update("owntracks/a/x", 1.0, 1.0)).unwrap();
        session.upsert(&update("owntracks/b/x", 2.0, 2.0)).unwrap();

        assert!(session.on_marker_click(&key("a", "x")));
        assert_eq!(session.open_popups(), vec![&key("a", "x")]);
        assert_eq!(session.surface().open_popups(), vec![MarkerId(0)]);

        assert!(!session.on_marker_click(&key("nobody", "x")));
    }

    #[test]
    fn test_plain_mode_leaves_popups_to_the_user() {
        let mut session = MapSession::new(HeadlessSurface::new()).with_singular_markers(false);
        session.upsert(&update("owntracks/a/x", 1.0, 1.0)).unwrap();
        session.upsert(&update("owntracks/b/x", 2.0, 2.0)).unwrap();
        assert!(session.open_popups().is_empty());

        session.on_marker_click(&key("a", "x"));
        session.on_marker_click(&key("b", "x"));
        assert_eq!(session.surface().open_popups().len(), 2);

        // Content follows updates without reopening or closing.
        session.upsert(&update("owntracks/a/x", 5.0, 5.0)).unwrap();
        let a = session.surface().marker(MarkerId(0)).unwrap();
        assert!(a.popup_open);
        assert!(a.popup_html.contains("(5,5)"));

        session.on_popup_closed(&key("a", "x"));
        assert_eq!(session.open_popups(), vec![&key("b", "x")]);
    }

    #[test]
    fn test_auto_fit_after_each_update() {
        let mut session = MapSession::new(HeadlessSurface::new()).with_auto_fit(true);
        session.upsert(&update("owntracks/a/x", 10.0, 20.0)).unwrap();
        session.upsert(&update("owntracks/b/x", 30.0, -5.0)).unwrap();

        assert_eq!(session.surface().fit_count(), 2);
        assert_eq!(
            session.surface().last_fit(),
            Some(&LatLngBounds::from_coords(10.0, -5.0, 30.0, 20.0))
        );
    }

    #[test]
    fn test_auto_fit_off_never_fits() {
        let mut session = MapSession::new(HeadlessSurface::new());
        session.upsert(&update("owntracks/a/x", 10.0, 20.0)).unwrap();
        assert_eq!(session.surface().fit_count(), 0);
    }

    #[test]
    fn test_enabling_auto_fit_fits_once() {
        let mut session = MapSession::new(HeadlessSurface::new());
        session.upsert(&update("owntracks/a/x", 10.0, 20.0)).unwrap();

        assert!(session.toggle_auto_fit());
        assert_eq!(session.surface().fit_count(), 1);

        assert!(!session.toggle_auto_fit());
        assert_eq!(session.surface().fit_count(), 1);
    }

    #[test]
    fn test_auto_fit_with_no_markers() {
        let mut session = MapSession::new(HeadlessSurface::new());
        session.set_auto_fit(true);

        assert!(session.auto_fit());
        assert_eq!(session.surface().fit_count(), 0);
        assert!(!session.fit_to_markers());
    }

    #[test]
    fn test_invalid_updates_are_rejected() {
        let mut session = MapSession::new(HeadlessSurface::new());
        assert!(session.upsert(&update("garbage", 1.0, 1.0)).is_err());

        let no_topic = LocationUpdate {
            lat: 1.0,
            lon: 1.0,
            ..Default::default()
        };
        assert!(session.upsert(&no_topic).is_err());
        assert!(session.is_empty());

        let batch = vec![update("garbage", 1.0, 1.0), update("owntracks/a/x", 1.0, 1.0)];
        assert_eq!(session.upsert_all(&batch), 1);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_from_config_uses_renames_and_style() {
        let mut config = ViewerConfig::default();
        config.renames.insert("jane/phone".to_string(), "Jane".to_string());
        config.marker_style.fill_color = "blue".to_string();
        config.auto_fit = true;

        let mut session = MapSession::from_config(HeadlessSurface::new(), &config);
        session.upsert(&update("owntracks/jane/phone", 1.0, 2.0)).unwrap();

        let marker = &session.surface().markers()[0];
        assert_eq!(marker.title, "Jane 1, 2");
        assert_eq!(marker.style.fill_color, "blue");
        assert_eq!(session.surface().fit_count(), 1);
    }
}
