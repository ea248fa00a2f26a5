//! Tree transformations applied by the pipeline. Each takes the document by
//! value and returns the updated one.

use quick_xml::events::Event;
use tracing::debug;

use crate::document::{Element, GpxDocument, Node};

/// Write resolved elevations into `<ele>`. `elevations[i]` belongs to the
/// i-th `<trkpt>` in document order; `None` leaves that point untouched.
pub fn set_elevations(mut doc: GpxDocument, elevations: &[Option<f64>]) -> GpxDocument {
    doc.for_each_track_point_mut(|index, pt| {
        if let Some(Some(value)) = elevations.get(index) {
            let text = value.to_string();
            match pt.first_child_mut(b"ele") {
                Some(ele) => ele.set_text(&text),
                None => {
                    let ele = Element::with_text(&child_name(pt, "ele"), &text);
                    pt.insert_child(0, Node::Element(ele));
                }
            }
        }
    });
    doc
}

/// Remove every `<extensions>` child of every `<trkpt>`, along with the
/// indentation in front of it.
pub fn strip_extensions(mut doc: GpxDocument) -> GpxDocument {
    let mut removed = 0usize;
    doc.for_each_track_point_mut(|_, pt| {
        let children = std::mem::take(&mut pt.children);
        let mut kept: Vec<Node> = Vec::with_capacity(children.len());
        for node in children {
            match node {
                Node::Element(e) if e.is(b"extensions") => {
                    if matches!(kept.last(), Some(Node::Raw(Event::Text(t))) if is_blank(t.as_ref()))
                    {
                        kept.pop();
                    }
                    removed += 1;
                }
                other => kept.push(other),
            }
        }
        pt.children = kept;
    });
    debug!(removed, "extensions_stripped");
    doc
}

/// Set the first track's `<name>`, creating it if absent. No-op without tracks.
pub fn set_track_name(mut doc: GpxDocument, name: &str) -> GpxDocument {
    match doc.root.child_elements_mut().find(|e| e.is(b"trk")) {
        Some(trk) => match trk.first_child_mut(b"name") {
            Some(el) => el.set_text(name),
            None => {
                let el = Element::with_text(&child_name(trk, "name"), name);
                trk.insert_child(0, Node::Element(el));
            }
        },
        None => debug!(name, "track_name_skipped_no_track"),
    }
    doc
}

/// Qualified name for a new child, reusing the parent's prefix (`g:trk` → `g:name`).
fn child_name(parent: &Element, local: &str) -> String {
    match parent.start.name().prefix() {
        Some(prefix) => format!("{}:{local}", String::from_utf8_lossy(prefix.as_ref())),
        None => local.to_string(),
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
