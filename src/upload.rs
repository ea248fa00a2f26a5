//! One upload end to end: enrich, render the viewer page, store both files.

use tracing::info;

use crate::error::UploadError;
use crate::pipeline::{Enriched, Pipeline};
use crate::storage::{OutputStore, StoredOutputs};
use crate::viewer;

/// Process an uploaded GPX file named `file_name`.
///
/// The viewer title is `title`, else the track name, else the file name.
/// Nothing is written unless every stage succeeded.
pub fn process_upload(
    pipeline: &Pipeline,
    store: &OutputStore,
    file_name: &str,
    raw: &[u8],
    track_name: Option<&str>,
    title: Option<&str>,
) -> Result<(Enriched, StoredOutputs), UploadError> {
    // Reject unusable names before any elevation lookup is made.
    store.output_paths(file_name)?;

    let enriched = pipeline.enrich_named(raw, track_name)?;
    let title = title
        .map(str::to_string)
        .or_else(|| enriched.track_name.clone())
        .unwrap_or_else(|| file_name.to_string());
    let html = viewer::render_html(&title, &enriched.points)?;
    let stored = store.store(file_name, &enriched, &html)?;

    info!(
        file_name,
        points = enriched.points.len(),
        resolved = enriched.summary.resolved,
        fallback = enriched.summary.fallback,
        "upload_processed"
    );
    Ok((enriched, stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::NoElevation;
    use crate::error::{EnrichError, ParseError, StorageError};
    use crate::options::PipelineOptions;

    const TRACK: &str = r#"<gpx version="1.1"><trk><trkseg><trkpt lat="35.0" lon="139.0"><ele>5</ele></trkpt></trkseg></trk></gpx>"#;

    #[test]
    fn test_title_falls_back_to_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let pipeline = Pipeline::new(PipelineOptions::default(), NoElevation);

        let (_, stored) =
            process_upload(&pipeline, &store, "lunch.gpx", TRACK.as_bytes(), None, None).unwrap();
        let page = std::fs::read_to_string(stored.html_path).unwrap();
        assert!(page.contains("<title>lunch.gpx</title>"));
    }

    #[test]
    fn test_malformed_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let pipeline = Pipeline::new(PipelineOptions::default(), NoElevation);

        let err = process_upload(&pipeline, &store, "bad.gpx", b"<gpx><trk>", None, None).unwrap_err();
        assert!(matches!(err, UploadError::Enrich(EnrichError::Parse(_))));

        let err = process_upload(
            &pipeline,
            &store,
            "bad.gpx",
            br#"<gpx version="1.1" version="1.0"/>"#,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Enrich(EnrichError::Parse(ParseError::Xml(_)))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_file_name_rejected_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let source = |_: f64, _: f64| -> crate::ElevationLookup { panic!("lookup must not run") };
        let pipeline = Pipeline::new(PipelineOptions::default(), source);

        let err = process_upload(&pipeline, &store, "..", TRACK.as_bytes(), None, None).unwrap_err();
        assert!(matches!(err, UploadError::Storage(StorageError::InvalidFileName(_))));
    }
}
