use geo::{Distance, Geodesic, Point};

use crate::gpx_types::{GpxTrack, TrackPoint};
use crate::options::DistanceMode;

/// Geodesic distance on the WGS-84 ellipsoid, in kilometres.
pub fn geodesic_km(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let pa = Point::new(a.longitude, a.latitude);
    let pb = Point::new(b.longitude, b.latitude);
    Geodesic::distance(pa, pb) / 1000.0
}

/// Fill `cumulative_distance_km` for every point. Only consecutive points of
/// the same segment contribute distance.
pub fn accumulate(tracks: &mut [GpxTrack], mode: DistanceMode) {
    let mut carried = 0.0;

    for segment in tracks.iter_mut().flat_map(|t| t.segments.iter_mut()) {
        let mut total = match mode {
            DistanceMode::PerSegment => 0.0,
            DistanceMode::Continuous => carried,
        };
        let points = &mut segment.points;
        for i in 0..points.len() {
            if i > 0 {
                total += geodesic_km(&points[i - 1], &points[i]);
            }
            points[i].cumulative_distance_km = total;
        }
        carried = total;
    }
}

/// Reset all distances to 0 (distance stage switched off).
pub fn clear(tracks: &mut [GpxTrack]) {
    for point in tracks
        .iter_mut()
        .flat_map(|t| t.segments.iter_mut())
        .flat_map(|s| s.points.iter_mut())
    {
        point.cumulative_distance_km = 0.0;
    }
}
