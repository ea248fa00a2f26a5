//! The enrichment pipeline.
//!
//! Stages run in a fixed order: parse, namespace repair, elevation
//! resolution, extension stripping, distance accumulation, serialization.
//! Only parse and namespace failures abort; a failed elevation lookup keeps
//! the point's own elevation.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::distance;
use crate::elevation::{ElevationLookup, ElevationSource, UnresolvedReason};
use crate::error::EnrichError;
use crate::gpx_types::{GpxTrack, RenderPoint, render_points};
use crate::namespace::{normalize_namespaces, undeclared_point_prefixes};
use crate::options::PipelineOptions;
use crate::parser::{parse_document, read_tracks};
use crate::transform::{set_elevations, set_track_name, strip_extensions};

/// Pipeline output: the rewritten GPX and the flat point list for renderers.
#[derive(Debug, Clone)]
pub struct Enriched {
    pub gpx: Vec<u8>,
    pub points: Vec<RenderPoint>,
    /// The override if one was given, else the first named track.
    pub track_name: Option<String>,
    pub summary: ResolutionSummary,
    /// Prefixes still used inside track points without a declaration, i.e.
    /// ones with no known namespace URI. Non-empty means `gpx` is not
    /// namespace-well-formed.
    pub unbound_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub resolved: usize,
    pub fallback: usize,
}

pub struct Pipeline {
    options: PipelineOptions,
    source: Box<dyn ElevationSource>,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, source: impl ElevationSource + 'static) -> Self {
        Self {
            options,
            source: Box::new(source),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn enrich(&self, raw: &[u8]) -> Result<Enriched, EnrichError> {
        self.enrich_named(raw, None)
    }

    /// Run every stage; `track_name` overrides the first track's `<name>`.
    pub fn enrich_named(&self, raw: &[u8], track_name: Option<&str>) -> Result<Enriched, EnrichError> {
        let mut doc = parse_document(raw)?;
        // Reject bad coordinates before any lookup is made.
        read_tracks(&doc)?;

        if self.options.normalize_namespaces {
            doc = normalize_namespaces(doc, &self.options.extension_namespaces)?;
        }

        let mut tracks = read_tracks(&doc)?;

        let mut summary = ResolutionSummary::default();
        if self.options.resolve_elevation {
            let elevations = self.resolve_elevations(&mut tracks, &mut summary);
            doc = set_elevations(doc, &elevations);
        }

        if self.options.strip_extensions {
            doc = strip_extensions(doc);
        }

        if self.options.compute_distance {
            distance::accumulate(&mut tracks, self.options.distance_mode);
        } else {
            distance::clear(&mut tracks);
        }

        if let Some(name) = track_name {
            doc = set_track_name(doc, name);
        }

        let unbound_prefixes: Vec<String> = undeclared_point_prefixes(&doc).into_iter().collect();
        if !unbound_prefixes.is_empty() {
            warn!(prefixes = ?unbound_prefixes, "output_has_unbound_prefixes");
        }

        let gpx = doc.to_bytes().map_err(EnrichError::Serialize)?;
        let points = render_points(&tracks);
        let track_name = track_name
            .map(str::to_string)
            .or_else(|| tracks.iter().find_map(|t| t.name.clone()));

        info!(
            points = points.len(),
            resolved = summary.resolved,
            fallback = summary.fallback,
            bytes = gpx.len(),
            "gpx_enriched"
        );

        Ok(Enriched {
            gpx,
            points,
            track_name,
            summary,
            unbound_prefixes,
        })
    }

    /// Look up every point in document order. Returns, per point, the value to
    /// write into `<ele>` (`None` keeps the original).
    fn resolve_elevations(
        &self,
        tracks: &mut [GpxTrack],
        summary: &mut ResolutionSummary,
    ) -> Vec<Option<f64>> {
        let points = tracks
            .iter_mut()
            .flat_map(|t| t.segments.iter_mut())
            .flat_map(|s| s.points.iter_mut());

        let mut resolved = Vec::new();
        for (index, point) in points.enumerate() {
            match self.source.lookup(point.latitude, point.longitude) {
                ElevationLookup::Resolved(elevation) => {
                    debug!(
                        index,
                        latitude = point.latitude,
                        longitude = point.longitude,
                        elevation,
                        "elevation_resolved"
                    );
                    point.elevation = Some(elevation);
                    summary.resolved += 1;
                    resolved.push(Some(elevation));
                }
                ElevationLookup::Unresolved(reason) => {
                    if reason == UnresolvedReason::Disabled {
                        debug!(index, "elevation_lookup_disabled");
                    } else {
                        warn!(
                            index,
                            latitude = point.latitude,
                            longitude = point.longitude,
                            reason = %reason,
                            fallback = ?point.elevation,
                            "elevation_fallback"
                        );
                    }
                    summary.fallback += 1;
                    resolved.push(None);
                }
            }
        }
        resolved
    }
}
