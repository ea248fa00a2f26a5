use std::str::Utf8Error;

use thiserror::Error;

/// Failure to read raw bytes as a GPX document. Fatal: no output is produced.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid UTF-8 in {context}: {source}")]
    Encoding {
        context: &'static str,
        #[source]
        source: Utf8Error,
    },
    #[error("document has no root element")]
    MissingRoot,
    #[error("root element is <{0}>, expected <gpx>")]
    UnexpectedRoot(String),
    #[error("unexpected element <{0}> after the root element")]
    TrailingElement(String),
    #[error("element <{0}> is never closed")]
    UnclosedElement(String),
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.into())
    }
}

/// Injecting a missing extension namespace produced a document that no longer parses.
#[derive(Debug, Error)]
pub enum NamespaceRepairError {
    #[error("document failed to reparse after declaring namespace prefix '{prefix}': {source}")]
    Reparse {
        prefix: String,
        #[source]
        source: ParseError,
    },
    #[error("failed to serialize document for namespace repair: {0}")]
    Serialize(#[from] std::io::Error),
}

/// Fatal pipeline failure. Per-point elevation failures never surface here.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    NamespaceRepair(#[from] NamespaceRepairError),
    #[error("failed to serialize enriched document: {0}")]
    Serialize(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file name '{0}' has no usable stem")]
    InvalidFileName(String),
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while turning one uploaded file into stored outputs.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Enrich(#[from] EnrichError),
    #[error("failed to render viewer: {0}")]
    Render(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
