//! Enrich GPX tracks with elevation data and render a static viewer.
//!
//! The core is [`Pipeline`]: parse, repair extension namespaces, resolve
//! elevation per point (falling back to the recorded value), strip point
//! extensions, accumulate geodesic distance and serialize. Everything the
//! pipeline does not touch is written back unchanged.

pub mod config;
pub mod converter;
pub mod distance;
pub mod document;
pub mod elevation;
pub mod error;
pub mod gpx_types;
pub mod namespace;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod transform;
pub mod upload;
pub mod viewer;

pub use crate::elevation::{ElevationLookup, ElevationSource, HttpElevationSource, NoElevation};
pub use crate::error::{EnrichError, NamespaceRepairError, ParseError, UploadError};
pub use crate::gpx_types::RenderPoint;
pub use crate::options::{DistanceMode, PipelineOptions};
pub use crate::pipeline::{Enriched, Pipeline, ResolutionSummary};
pub use crate::upload::process_upload;

/// Enrich `raw` with default options against `source`.
pub fn enrich(raw: &[u8], source: impl ElevationSource + 'static) -> Result<Enriched, EnrichError> {
    Pipeline::new(PipelineOptions::default(), source).enrich(raw)
}
