use crate::core::geo::LatLng;

/// One device's marker as tracked by the session: the surface handle plus
/// what the surface was last told about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker<H> {
    handle: H,
    position: LatLng,
    title: String,
    popup_html: String,
    popup_open: bool,
}

impl<H> Marker<H> {
    pub(crate) fn new(handle: H, position: LatLng, title: String, popup_html: String) -> Self {
        Self {
            handle,
            position,
            title,
            popup_html,
            popup_open: false,
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn popup_html(&self) -> &str {
        &self.popup_html
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup_open
    }

    pub(crate) fn set_position(&mut self, position: LatLng, title: String) {
        self.position = position;
        self.title = title;
    }

    pub(crate) fn set_popup_html(&mut self, html: String) {
        self.popup_html = html;
    }

    pub(crate) fn set_popup_open(&mut self, open: bool) {
        self.popup_open = open;
    }
}
