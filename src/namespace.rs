//! Extension namespace repair.
//!
//! Devices often write `gpxtpx:` or `gpxx:` elements inside track points
//! without declaring the prefix. Prefixes are matched exactly and
//! case-sensitively; a URI already bound under another prefix does not
//! declare the prefix in use.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::document::{Element, GpxDocument};
use crate::error::NamespaceRepairError;
use crate::parser::parse_document;

/// Declare every undeclared prefix used inside `<trkpt>` elements that has a
/// known namespace URI on the root element, then reparse the result.
pub fn normalize_namespaces(
    doc: GpxDocument,
    known: &BTreeMap<String, String>,
) -> Result<GpxDocument, NamespaceRepairError> {
    let missing = undeclared_point_prefixes(&doc);
    if missing.is_empty() {
        return Ok(doc);
    }

    let mut doc = doc;
    let mut injected = Vec::new();
    for prefix in missing {
        match known.get(&prefix) {
            Some(uri) => {
                let key = format!("xmlns:{prefix}");
                doc.root.start.push_attribute((key.as_str(), uri.as_str()));
                debug!(prefix = %prefix, uri = %uri, "namespace_declared");
                injected.push(prefix);
            }
            None => warn!(prefix = %prefix, "undeclared_prefix_unknown_namespace"),
        }
    }

    if injected.is_empty() {
        return Ok(doc);
    }

    let bytes = doc.to_bytes()?;
    parse_document(&bytes).map_err(|source| NamespaceRepairError::Reparse {
        prefix: injected.join(","),
        source,
    })
}

/// Prefixes referenced by elements or attributes at or below a `<trkpt>`
/// that have no `xmlns:` declaration in scope.
pub fn undeclared_point_prefixes(doc: &GpxDocument) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    walk(&doc.root, Vec::new(), false, &mut missing);
    missing
}

fn walk(
    el: &Element,
    mut scope: Vec<Vec<u8>>,
    inside_point: bool,
    missing: &mut BTreeSet<String>,
) {
    let mut used: Vec<Vec<u8>> = Vec::new();
    if let Some(prefix) = el.start.name().prefix() {
        used.push(prefix.as_ref().to_vec());
    }

    // attribute syntax was checked by the parser
    for attr in el.start.attributes().flatten() {
        if let Some(declared) = attr.key.as_ref().strip_prefix(b"xmlns:") {
            scope.push(declared.to_vec());
        } else if let Some(prefix) = attr.key.prefix() {
            used.push(prefix.as_ref().to_vec());
        }
    }

    let inside_point = inside_point || el.is(b"trkpt");
    if inside_point {
        for prefix in used {
            if prefix != b"xml" && prefix != b"xmlns" && !scope.contains(&prefix) {
                missing.insert(String::from_utf8_lossy(&prefix).into_owned());
            }
        }
    }

    for child in el.child_elements() {
        walk(child, scope.clone(), inside_point, missing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{GARMIN_TRACK_POINT_EXTENSION_V1, PipelineOptions};

    fn known() -> BTreeMap<String, String> {
        PipelineOptions::default().extension_namespaces
    }

    fn normalize(xml: &str) -> String {
        let doc = parse_document(xml.as_bytes()).unwrap();
        let doc = normalize_namespaces(doc, &known()).unwrap();
        String::from_utf8(doc.to_bytes().unwrap()).unwrap()
    }

    const UNDECLARED: &str = r#"<gpx version="1.1" creator="watch">
  <trk><trkseg>
    <trkpt lat="35.0" lon="139.0">
      <extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>150</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>
    </trkpt>
  </trkseg></trk>
</gpx>"#;

    #[test]
    fn test_missing_prefix_injected_on_root() {
        let out = normalize(UNDECLARED);
        let expected = format!(
            r#"<gpx version="1.1" creator="watch" xmlns:gpxtpx="{GARMIN_TRACK_POINT_EXTENSION_V1}">"#
        );
        assert!(out.contains(&expected), "{out}");

        let reparsed = parse_document(out.as_bytes()).unwrap();
        assert!(undeclared_point_prefixes(&reparsed).is_empty());
    }

    #[test]
    fn test_declared_on_root_untouched() {
        let xml = format!(
            r#"<gpx xmlns:gpxtpx="{GARMIN_TRACK_POINT_EXTENSION_V1}"><trk><trkseg><trkpt lat="1" lon="2"><extensions><gpxtpx:hr>90</gpxtpx:hr></extensions></trkpt></trkseg></trk></gpx>"#
        );
        let out = normalize(&xml);
        assert_eq!(out.matches("xmlns:gpxtpx").count(), 1);
    }

    #[test]
    fn test_inline_declaration_counts() {
        let xml = format!(
            r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"><extensions><gpxtpx:TrackPointExtension xmlns:gpxtpx="{GARMIN_TRACK_POINT_EXTENSION_V1}"><gpxtpx:hr>90</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions></trkpt></trkseg></trk></gpx>"#
        );
        let doc = parse_document(xml.as_bytes()).unwrap();
        assert!(undeclared_point_prefixes(&doc).is_empty());
    }

    #[test]
    fn test_alias_does_not_declare_prefix() {
        let xml = format!(
            r#"<gpx xmlns:tpx="{GARMIN_TRACK_POINT_EXTENSION_V1}"><trk><trkseg><trkpt lat="1" lon="2"><extensions><gpxtpx:hr>90</gpxtpx:hr></extensions></trkpt></trkseg></trk></gpx>"#
        );
        let out = normalize(&xml);
        assert!(out.contains("xmlns:tpx="));
        assert!(out.contains("xmlns:gpxtpx="));
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        let xml = format!(
            r#"<gpx xmlns:GPXTPX="{GARMIN_TRACK_POINT_EXTENSION_V1}"><trk><trkseg><trkpt lat="1" lon="2"><extensions><gpxtpx:hr>90</gpxtpx:hr></extensions></trkpt></trkseg></trk></gpx>"#
        );
        let doc = parse_document(xml.as_bytes()).unwrap();
        let missing = undeclared_point_prefixes(&doc);
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["gpxtpx"]);
    }

    #[test]
    fn test_unknown_prefix_left_alone() {
        let xml = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"><extensions><acme:power>250</acme:power></extensions></trkpt></trkseg></trk></gpx>"#;
        let out = normalize(xml);
        assert!(!out.contains("xmlns:acme"));
        assert!(out.contains("<acme:power>250</acme:power>"));
    }

    #[test]
    fn test_prefixes_outside_points_ignored() {
        let xml = r#"<gpx><metadata><extensions><acme:device>x</acme:device></extensions></metadata></gpx>"#;
        let doc = parse_document(xml.as_bytes()).unwrap();
        assert!(undeclared_point_prefixes(&doc).is_empty());
    }

    #[test]
    fn test_prefixed_attribute_detected() {
        let xml = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2" gpxx:flag="1"/></trkseg></trk></gpx>"#;
        let doc = parse_document(xml.as_bytes()).unwrap();
        let missing = undeclared_point_prefixes(&doc);
        assert!(missing.contains("gpxx"));
    }
}
