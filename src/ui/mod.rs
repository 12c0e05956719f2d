pub mod popup;
pub mod style;
pub mod surface;

pub use popup::{escape_html, HtmlPopup};

pub use style::{MarkerStyle, TrackStyle};

pub use surface::{HeadlessMarker, HeadlessSurface, MarkerId};
