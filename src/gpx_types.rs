use serde::Serialize;

/// A single track point (<trkpt>) as seen by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    /// Raw `<time>` text, passed through unparsed.
    pub time: Option<String>,
    pub cumulative_distance_km: f64,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
            cumulative_distance_km: 0.0,
        }
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxSegment {
    pub points: Vec<TrackPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub segments: Vec<GpxSegment>,
}

impl GpxTrack {
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }
}

/// Flat per-point record handed to renderers. `elevation` is always
/// serialized, as `null` when unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl From<&TrackPoint> for RenderPoint {
    fn from(pt: &TrackPoint) -> Self {
        Self {
            latitude: pt.latitude,
            longitude: pt.longitude,
            elevation: pt.elevation,
            distance_km: pt.cumulative_distance_km,
            time: pt.time.clone(),
        }
    }
}

/// Flatten tracks into the ordered render list.
pub fn render_points(tracks: &[GpxTrack]) -> Vec<RenderPoint> {
    tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|s| s.points.iter())
        .map(RenderPoint::from)
        .collect()
}
