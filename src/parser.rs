use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::document::{Element, GpxDocument, Node};
use crate::error::ParseError;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, ParseError>;

/// Parse raw GPX bytes into a lossless document tree.
///
/// Fails on malformed XML, unclosed elements, invalid UTF-8, or a root element
/// other than `<gpx>`.
pub fn parse_document(raw: &[u8]) -> Result<GpxDocument> {
    let xml = std::str::from_utf8(raw).map_err(|source| ParseError::Encoding {
        context: "document",
        source,
    })?;
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);

    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                check_attributes(&e)?;
                stack.push(Element {
                    start: e.into_owned(),
                    end: None,
                    children: Vec::new(),
                });
            }
            Event::Empty(e) => {
                check_attributes(&e)?;
                let el = Element {
                    start: e.into_owned(),
                    end: None,
                    children: Vec::new(),
                };
                attach(el, &mut stack, &mut root)?;
            }
            Event::End(e) => {
                // The reader checks end names, so the top of the stack matches.
                let Some(mut el) = stack.pop() else {
                    return Err(ParseError::MissingRoot);
                };
                el.end = Some(e.into_owned());
                attach(el, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            other => {
                let event = other.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Raw(event)),
                    None if root.is_none() => prolog.push(event),
                    None => epilog.push(event),
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::UnclosedElement(open.name()));
    }

    let root = root.ok_or(ParseError::MissingRoot)?;
    if !root.is(b"gpx") {
        return Err(ParseError::UnexpectedRoot(root.name()));
    }

    Ok(GpxDocument {
        prolog,
        root,
        epilog,
    })
}

/// The reader only splits tags; attribute syntax (`<trk foo>`, duplicated
/// names) is checked here so every later stage can trust the attributes.
fn check_attributes(e: &BytesStart<'_>) -> Result<()> {
    for attr in e.attributes() {
        attr?;
    }
    Ok(())
}

fn attach(el: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
    } else if root.is_none() {
        *root = Some(el);
    } else {
        return Err(ParseError::TrailingElement(el.name()));
    }
    Ok(())
}

/// Read the typed track view (tracks, segments, points) from a document.
///
/// Every `<trkpt>` must carry numeric `lat` and `lon` attributes; an
/// unparsable `<ele>` is treated as absent.
pub fn read_tracks(doc: &GpxDocument) -> Result<Vec<GpxTrack>> {
    doc.tracks().map(read_track).collect()
}

fn read_track(trk: &Element) -> Result<GpxTrack> {
    let name = trk.first_child(b"name").map(Element::text).transpose()?;
    let segments = trk
        .child_elements()
        .filter(|e| e.is(b"trkseg"))
        .map(read_segment)
        .collect::<Result<Vec<_>>>()?;

    Ok(GpxTrack { name, segments })
}

fn read_segment(seg: &Element) -> Result<GpxSegment> {
    let points = seg
        .child_elements()
        .filter(|e| e.is(b"trkpt"))
        .map(read_point)
        .collect::<Result<Vec<_>>>()?;

    Ok(GpxSegment { points })
}

/// Read a `<trkpt>` element and the children the pipeline cares about.
pub(crate) fn read_point(el: &Element) -> Result<TrackPoint> {
    let (lat, lon) = parse_lat_lon(&el.start)?;
    let mut point = TrackPoint::new(lat, lon);

    if let Some(ele) = el.first_child(b"ele") {
        point.elevation = ele.text()?.trim().parse::<f64>().ok();
    }
    if let Some(time) = el.first_child(b"time") {
        point.time = Some(time.text()?.trim().to_string());
    }

    Ok(point)
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let key = attr.key.local_name();
        let val = std::str::from_utf8(&attr.value).map_err(|source| ParseError::Encoding {
            context: "trkpt attribute",
            source,
        })?;
        match key.as_ref() {
            b"lat" => lat = Some(parse_coordinate("lat", val, 90.0)?),
            b"lon" => lon = Some(parse_coordinate("lon", val, 180.0)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(ParseError::MissingAttribute {
        element: "trkpt",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(ParseError::MissingAttribute {
        element: "trkpt",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

fn parse_coordinate(attribute: &'static str, val: &str, limit: f64) -> Result<f64> {
    let invalid = || ParseError::InvalidAttribute {
        element: "trkpt",
        attribute,
        value: val.to_string(),
    };
    let v = val.trim().parse::<f64>().map_err(|_| invalid())?;
    if !v.is_finite() || v.abs() > limit {
        return Err(invalid());
    }
    Ok(v)
}
