use serde::{Deserialize, Serialize};

/// Visual style handed to the map surface when a marker is created.
///
/// Colors are CSS color strings so that web surfaces can pass them through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    /// Circle radius in pixels
    pub radius: f32,
    /// Fill color
    pub fill_color: String,
    /// Fill opacity (0.0 - 1.0)
    pub fill_opacity: f32,
    /// Border color
    pub stroke_color: String,
    /// Border width
    pub stroke_weight: f32,
    /// Border opacity (0.0 - 1.0)
    pub opacity: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 5.0,
            fill_color: "red".to_string(),
            fill_opacity: 0.9,
            stroke_color: "white".to_string(),
            stroke_weight: 2.0,
            opacity: 1.0,
        }
    }
}

/// Style for track polylines and area outlines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackStyle {
    pub color: String,
    pub weight: f32,
}

impl Default for TrackStyle {
    fn default() -> Self {
        Self {
            color: "red".to_string(),
            weight: 4.0,
        }
    }
}
