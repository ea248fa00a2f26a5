use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::gpx_types::RenderPoint;

/// Convert the enriched point list to a GeoJSON FeatureCollection for the viewer.
///
/// Two or more points become one `LineString`; per-point elevation, distance
/// and time go into `coordinateProperties`, with unknown values as `null`.
pub fn to_feature_collection(points: &[RenderPoint], name: Option<&str>) -> FeatureCollection {
    let features = match points {
        [] => Vec::new(),
        [pt] => vec![single_point_feature(pt, name)],
        _ => vec![line_feature(points, name)],
    };

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn line_feature(points: &[RenderPoint], name: Option<&str>) -> Feature {
    let with_elevation = points.iter().all(|pt| pt.elevation.is_some());
    let coords: Vec<Vec<f64>> = points
        .iter()
        .map(|pt| point_coords(pt, with_elevation))
        .collect();

    let geometry = Geometry::new(Value::LineString(coords));
    let mut props = base_props(name);

    let mut coord_props = Map::new();
    coord_props.insert(
        "elevations".to_string(),
        JsonValue::Array(points.iter().map(|pt| number_or_null(pt.elevation)).collect()),
    );
    coord_props.insert(
        "distances_km".to_string(),
        JsonValue::Array(
            points
                .iter()
                .map(|pt| number_or_null(Some(pt.distance_km)))
                .collect(),
        ),
    );

    let times: Vec<JsonValue> = points
        .iter()
        .map(|pt| match &pt.time {
            Some(t) => JsonValue::String(t.clone()),
            None => JsonValue::Null,
        })
        .collect();
    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        coord_props.insert("times".to_string(), JsonValue::Array(times));
    }

    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn single_point_feature(pt: &RenderPoint, name: Option<&str>) -> Feature {
    let geometry = Geometry::new(Value::Point(point_coords(pt, pt.elevation.is_some())));

    let mut props = base_props(name);
    props.insert("ele".to_string(), number_or_null(pt.elevation));
    if let Some(ref time) = pt.time {
        props.insert("time".to_string(), JsonValue::String(time.clone()));
    }

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn base_props(name: Option<&str>) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );
    if let Some(name) = name {
        props.insert("name".to_string(), JsonValue::String(name.to_string()));
    }
    props
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &RenderPoint, include_elevation: bool) -> Vec<f64> {
    match (include_elevation, pt.elevation) {
        (true, Some(ele)) => vec![pt.longitude, pt.latitude, ele],
        _ => vec![pt.longitude, pt.latitude],
    }
}

fn number_or_null(value: Option<f64>) -> JsonValue {
    value
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
