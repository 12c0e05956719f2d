pub mod frame;
pub mod geojson;
pub mod location;
