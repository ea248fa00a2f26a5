use std::collections::BTreeMap;

use serde::Deserialize;

pub const GARMIN_TRACK_POINT_EXTENSION_V1: &str =
    "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
pub const GARMIN_GPX_EXTENSIONS_V3: &str = "http://www.garmin.com/xmlschemas/GpxExtensions/v3";

/// Stage switches and parameters for the enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Declare known extension prefixes used inside track points (default: true)
    pub normalize_namespaces: bool,

    /// Look up elevation for every track point (default: true)
    pub resolve_elevation: bool,

    /// Remove `<extensions>` from every track point (default: true)
    pub strip_extensions: bool,

    /// Compute cumulative geodesic distance (default: true)
    pub compute_distance: bool,

    /// Where cumulative distance restarts (default: per segment)
    pub distance_mode: DistanceMode,

    /// Extension prefix to namespace URI, used when a prefix is undeclared.
    pub extension_namespaces: BTreeMap<String, String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            normalize_namespaces: true,
            resolve_elevation: true,
            strip_extensions: true,
            compute_distance: true,
            distance_mode: DistanceMode::default(),
            extension_namespaces: default_extension_namespaces(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Each segment starts at 0 km.
    #[default]
    PerSegment,
    /// The running total carries across segments and tracks; the gap between
    /// segments is not counted.
    Continuous,
}

fn default_extension_namespaces() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "gpxtpx".to_string(),
            GARMIN_TRACK_POINT_EXTENSION_V1.to_string(),
        ),
        ("gpxx".to_string(), GARMIN_GPX_EXTENSIONS_V3.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_keeps_defaults() {
        let opts: PipelineOptions = toml::from_str(
            r#"
strip_extensions = false
distance_mode = "continuous"
"#,
        )
        .unwrap();
        assert!(!opts.strip_extensions);
        assert!(opts.resolve_elevation);
        assert_eq!(opts.distance_mode, DistanceMode::Continuous);
        assert_eq!(
            opts.extension_namespaces.get("gpxtpx").map(String::as_str),
            Some(GARMIN_TRACK_POINT_EXTENSION_V1)
        );
    }
}
