//! Lossless XML tree for GPX documents.
//!
//! Start tags, end tags, text, comments and entity references are kept as the
//! reader produced them, so anything the pipeline does not touch is written
//! back byte-for-byte.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::ParseError;

/// A child of an element.
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    /// Text, CDATA, comments, processing instructions and entity references.
    Raw(Event<'static>),
}

/// An element with its original tags. `end` is `None` for a self-closing element.
#[derive(Debug, Clone)]
pub struct Element {
    pub start: BytesStart<'static>,
    pub end: Option<BytesEnd<'static>>,
    pub children: Vec<Node>,
}

impl Element {
    /// A new, empty `<name></name>` element.
    pub fn new(name: &str) -> Self {
        Self {
            start: BytesStart::new(name.to_string()),
            end: Some(BytesEnd::new(name.to_string())),
            children: Vec::new(),
        }
    }

    pub fn with_text(name: &str, text: &str) -> Self {
        let mut el = Self::new(name);
        el.set_text(text);
        el
    }

    /// Compare the local (unprefixed) tag name.
    pub fn is(&self, local: &[u8]) -> bool {
        self.start.local_name().as_ref() == local
    }

    /// Qualified tag name, lossily decoded for logging and error messages.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.start.name().as_ref()).into_owned()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Raw(_) => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> + '_ {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Raw(_) => None,
        })
    }

    pub fn first_child(&self, local: &[u8]) -> Option<&Element> {
        self.child_elements().find(|e| e.is(local))
    }

    pub fn first_child_mut(&mut self, local: &[u8]) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.is(local))
    }

    /// Concatenated text content of the direct children.
    /// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
    pub fn text(&self) -> Result<String, ParseError> {
        let mut text = String::new();

        for node in &self.children {
            match node {
                Node::Raw(Event::Text(e)) => text.push_str(utf8(e.as_ref(), "text")?),
                Node::Raw(Event::CData(e)) => text.push_str(utf8(e.as_ref(), "CDATA")?),
                Node::Raw(Event::GeneralRef(e)) => {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        text.push(ch);
                    } else {
                        match utf8(e.as_ref(), "entity reference")? {
                            "amp" => text.push('&'),
                            "lt" => text.push('<'),
                            "gt" => text.push('>'),
                            "quot" => text.push('"'),
                            "apos" => text.push('\''),
                            _ => {} // Unknown entity, skip
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(text)
    }

    /// Replace all children with a single escaped text node.
    pub fn set_text(&mut self, text: &str) {
        self.ensure_open();
        self.children = vec![Node::Raw(Event::Text(BytesText::new(text).into_owned()))];
    }

    /// Insert a child node, turning a self-closing element into an open one first.
    pub fn insert_child(&mut self, index: usize, node: Node) {
        self.ensure_open();
        let index = index.min(self.children.len());
        self.children.insert(index, node);
    }

    fn ensure_open(&mut self) {
        if self.end.is_none() {
            let name = String::from_utf8_lossy(self.start.name().as_ref()).into_owned();
            self.end = Some(BytesEnd::new(name));
        }
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        match &self.end {
            None => writer.write_event(Event::Empty(self.start.borrow())),
            Some(end) => {
                writer.write_event(Event::Start(self.start.borrow()))?;
                for child in &self.children {
                    match child {
                        Node::Element(e) => e.write_to(writer)?,
                        Node::Raw(event) => writer.write_event(event.borrow())?,
                    }
                }
                writer.write_event(Event::End(end.borrow()))
            }
        }
    }
}

/// A parsed GPX document: everything before the root, the root `<gpx>`
/// element, and everything after it.
#[derive(Debug, Clone)]
pub struct GpxDocument {
    pub prolog: Vec<Event<'static>>,
    pub root: Element,
    pub epilog: Vec<Event<'static>>,
}

impl GpxDocument {
    /// Iterate `<trk>` elements in document order.
    pub fn tracks(&self) -> impl Iterator<Item = &Element> + '_ {
        self.root.child_elements().filter(|e| e.is(b"trk"))
    }

    /// Iterate `<trkpt>` elements of every track and segment in document order.
    pub fn track_points(&self) -> impl Iterator<Item = &Element> + '_ {
        self.tracks()
            .flat_map(|trk| trk.child_elements().filter(|e| e.is(b"trkseg")))
            .flat_map(|seg| seg.child_elements().filter(|e| e.is(b"trkpt")))
    }

    /// Visit every `<trkpt>` mutably, with its index in document order.
    pub fn for_each_track_point_mut(&mut self, mut f: impl FnMut(usize, &mut Element)) {
        let mut index = 0;
        for trk in self.root.child_elements_mut().filter(|e| e.is(b"trk")) {
            for seg in trk.child_elements_mut().filter(|e| e.is(b"trkseg")) {
                for pt in seg.child_elements_mut().filter(|e| e.is(b"trkpt")) {
                    f(index, pt);
                    index += 1;
                }
            }
        }
    }

    /// Serialize as UTF-8 XML. Any declaration from the input is replaced by
    /// `<?xml version="1.0" encoding="UTF-8"?>`.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let had_decl = self.prolog.iter().any(|e| matches!(e, Event::Decl(_)));
        if !had_decl {
            writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
        }

        for event in self.prolog.iter().filter(|e| !matches!(e, Event::Decl(_))) {
            writer.write_event(event.borrow())?;
        }
        self.root.write_to(&mut writer)?;
        for event in &self.epilog {
            writer.write_event(event.borrow())?;
        }

        Ok(writer.into_inner())
    }
}

fn utf8<'a>(bytes: &'a [u8], context: &'static str) -> Result<&'a str, ParseError> {
    std::str::from_utf8(bytes).map_err(|source| ParseError::Encoding { context, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn roundtrip(xml: &str) -> String {
        let doc = parse_document(xml.as_bytes()).unwrap();
        String::from_utf8(doc.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_untouched_document_is_byte_identical() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test" custom:attr='x'>
  <!-- recorded on a watch -->
  <trk>
    <name>Caf&#233; &amp; Bar</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0" ><ele>10.0</ele><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="35.001" lon="139.001" />
    </trkseg>
  </trk>
</gpx>
"#;
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_declaration_added_when_missing() {
        let out = roundtrip(r#"<gpx version="1.1"></gpx>"#);
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.1\"></gpx>"
        );
    }

    #[test]
    fn test_declaration_normalized() {
        let out = roundtrip("<?xml version='1.0'?>\n<gpx/>");
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx/>");
    }

    #[test]
    fn test_text_with_entities_and_cdata() {
        let doc = parse_document(
            br#"<gpx><trk><name>A &amp; B &#60;<![CDATA[ & C]]></name></trk></gpx>"#,
        )
        .unwrap();
        let trk = doc.tracks().next().unwrap();
        assert_eq!(trk.first_child(b"name").unwrap().text().unwrap(), "A & B < & C");
    }

    #[test]
    fn test_set_text_escapes() {
        let mut el = Element::new("name");
        el.set_text("Fish & Chips");
        let doc = GpxDocument {
            prolog: Vec::new(),
            root: el,
            epilog: Vec::new(),
        };
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.ends_with("<name>Fish &amp; Chips</name>"));
    }

    #[test]
    fn test_insert_child_opens_empty_element() {
        let mut doc = parse_document(br#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#)
            .unwrap();
        doc.for_each_track_point_mut(|_, pt| {
            pt.insert_child(0, Node::Element(Element::with_text("ele", "5")));
        });
        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"<trkpt lat="1" lon="2"><ele>5</ele></trkpt>"#));
    }

    #[test]
    fn test_track_points_document_order() {
        let doc = parse_document(
            br#"<gpx>
  <trk><trkseg><trkpt lat="1" lon="1"/><trkpt lat="2" lon="2"/></trkseg></trk>
  <trk><trkseg><trkpt lat="3" lon="3"/></trkseg><trkseg><trkpt lat="4" lon="4"/></trkseg></trk>
</gpx>"#,
        )
        .unwrap();
        let lats: Vec<String> = doc
            .track_points()
            .map(|pt| {
                let attr = pt.start.try_get_attribute("lat").unwrap().unwrap();
                String::from_utf8(attr.value.to_vec()).unwrap()
            })
            .collect();
        assert_eq!(lats, vec!["1", "2", "3", "4"]);
    }
}
