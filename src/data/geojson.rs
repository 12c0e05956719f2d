use crate::core::geo::{LatLng, LatLngBounds, LngUnwrapper};
use crate::prelude::HashMap;
use crate::traits::MapSurface;
use crate::ui::popup::escape_html;
use crate::ui::style::{MarkerStyle, TrackStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    pub id: Option<Value>,
    pub geometry: Option<GeoJsonGeometry>,
    pub properties: Option<HashMap<String, Value>>,
}

/// Root GeoJSON object as returned by the recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
}

impl GeoJson {
    pub fn features(&self) -> &[GeoJsonFeature] {
        match self {
            GeoJson::Feature(feature) => std::slice::from_ref(feature),
            GeoJson::FeatureCollection { features } => features,
        }
    }
}

/// A renderable piece of a track, in normalized (continuous) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackShape {
    Point(LatLng),
    Path(Vec<LatLng>),
    /// Polygon rings, exterior first
    Area(Vec<Vec<LatLng>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeature {
    pub shapes: Vec<TrackShape>,
    pub properties: HashMap<String, Value>,
    /// Popup HTML, only built for point features
    pub popup: Option<String>,
}

/// Track and area data fetched from the recorder, prepared for rendering.
///
/// Coordinates are normalized across the antimeridian in document order:
/// the reference longitude carries over from one feature to the next, the
/// way a streaming GeoJSON reader would visit them.
pub struct TrackLayer {
    features: Vec<TrackFeature>,
    style: TrackStyle,
    point_style: MarkerStyle,
}

impl TrackLayer {
    /// Creates a track layer from raw JSON string
    pub fn from_str(geojson_str: &str) -> crate::Result<Self> {
        let data: GeoJson = serde_json::from_str(geojson_str)
            .map_err(|e| crate::Error::ParseError(format!("Invalid GeoJSON: {}", e)))?;
        Ok(Self::new(&data))
    }

    pub fn new(data: &GeoJson) -> Self {
        Self::with_unwrapper(data, LngUnwrapper::new())
    }

    /// Starts normalization from a caller-supplied reference longitude.
    pub fn with_unwrapper(data: &GeoJson, mut unwrapper: LngUnwrapper) -> Self {
        let features = data
            .features()
            .iter()
            .map(|feature| {
                let properties = feature.properties.clone().unwrap_or_default();
                let mut shapes = Vec::new();
                let mut popup = None;

                if let Some(geometry) = &feature.geometry {
                    if let GeoJsonGeometry::Point { coordinates } = geometry {
                        popup = Some(point_popup(coordinates, &properties));
                    }
                    collect_shapes(geometry, &mut unwrapper, &mut shapes);
                }

                TrackFeature {
                    shapes,
                    properties,
                    popup,
                }
            })
            .collect();

        Self {
            features,
            style: TrackStyle::default(),
            point_style: MarkerStyle::default(),
        }
    }

    pub fn with_styles(mut self, style: TrackStyle, point_style: MarkerStyle) -> Self {
        self.style = style;
        self.point_style = point_style;
        self
    }

    pub fn features(&self) -> &[TrackFeature] {
        &self.features
    }

    pub fn is_empty(&self) -> bool {
        self.features.iter().all(|f| f.shapes.is_empty())
    }

    /// Bounds over the normalized coordinates
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut points = Vec::new();
        for shape in self.features.iter().flat_map(|f| f.shapes.iter()) {
            match shape {
                TrackShape::Point(p) => points.push(*p),
                TrackShape::Path(path) => points.extend(path.iter().copied()),
                TrackShape::Area(rings) => points.extend(rings.iter().flatten().copied()),
            }
        }
        LatLngBounds::from_points(points)
    }

    /// Draws every shape on the surface, then fits the view to the track.
    pub fn render<S: MapSurface>(&self, surface: &mut S) {
        for feature in &self.features {
            for shape in &feature.shapes {
                match shape {
                    TrackShape::Point(position) => {
                        surface.add_point(*position, &self.point_style, feature.popup.as_deref())
                    }
                    TrackShape::Path(path) => surface.add_polyline(path, &self.style),
                    TrackShape::Area(rings) => surface.add_polygon(rings, &self.style),
                }
            }
        }

        match self.bounds() {
            Some(bounds) => surface.fit_bounds(&bounds),
            None => log::debug!("track layer is empty, keeping the current view"),
        }
    }
}

fn to_lat_lng(coord: &[f64; 2]) -> LatLng {
    LatLng::new(coord[1], coord[0])
}

fn unwrap_coords(coords: &[[f64; 2]], unwrapper: &mut LngUnwrapper) -> Vec<LatLng> {
    coords
        .iter()
        .map(|c| unwrapper.unwrap_point(to_lat_lng(c)))
        .collect()
}

fn collect_shapes(geometry: &GeoJsonGeometry, unwrapper: &mut LngUnwrapper, shapes: &mut Vec<TrackShape>) {
    match geometry {
        GeoJsonGeometry::Point { coordinates } => {
            shapes.push(TrackShape::Point(unwrapper.unwrap_point(to_lat_lng(coordinates))));
        }
        GeoJsonGeometry::MultiPoint { coordinates } => {
            for c in coordinates {
                shapes.push(TrackShape::Point(unwrapper.unwrap_point(to_lat_lng(c))));
            }
        }
        GeoJsonGeometry::LineString { coordinates } => {
            shapes.push(TrackShape::Path(unwrap_coords(coordinates, unwrapper)));
        }
        GeoJsonGeometry::MultiLineString { coordinates } => {
            for line in coordinates {
                shapes.push(TrackShape::Path(unwrap_coords(line, unwrapper)));
            }
        }
        GeoJsonGeometry::Polygon { coordinates } => {
            let rings = coordinates
                .iter()
                .map(|ring| unwrap_coords(ring, unwrapper))
                .collect();
            shapes.push(TrackShape::Area(rings));
        }
        GeoJsonGeometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                let rings = polygon
                    .iter()
                    .map(|ring| unwrap_coords(ring, unwrapper))
                    .collect();
                shapes.push(TrackShape::Area(rings));
            }
        }
        GeoJsonGeometry::GeometryCollection { geometries } => {
            for geom in geometries {
                collect_shapes(geom, unwrapper, shapes);
            }
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Popup for a single recorded point: time, coordinates, address, speed.
fn point_popup(coordinates: &[f64; 2], properties: &HashMap<String, Value>) -> String {
    let mut lines = Vec::new();

    if let Some(tst) = properties.get("tst").and_then(Value::as_i64) {
        if let Some(time) = chrono::DateTime::from_timestamp(tst, 0) {
            lines.push(time.format("%Y-%m-%d, %a, %H:%M:%S %:z").to_string());
        }
    }

    lines.push(format!(
        "<span class=\"latlon\">{:.5},{:.5}</span>",
        coordinates[1], coordinates[0]
    ));

    if let Some(address) = properties.get("address").and_then(value_text) {
        lines.push(escape_html(&address));
    }

    if let Some(vel) = properties.get("vel").and_then(value_text) {
        lines.push(format!("{} km/h", escape_html(&vel)));
    }

    lines.join("<br/>")
}
