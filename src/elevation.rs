//! Elevation lookup by coordinate.
//!
//! A lookup never fails the pipeline: it either resolves to a value or
//! reports why it could not, and the caller falls back to the point's own
//! elevation.

use std::fmt;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::debug;

/// Default DEM endpoint (GSI, Japan). Returns `{"elevation": 35.2, "hsrc": ...}`.
pub const DEFAULT_ENDPOINT: &str =
    "https://cyberjapandata2.gsi.go.jp/general/dem/scripts/getelevation.php";

#[derive(Debug, Clone, PartialEq)]
pub enum ElevationLookup {
    Resolved(f64),
    Unresolved(UnresolvedReason),
}

/// Why a single lookup fell back.
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    Disabled,
    Network(String),
    Status(u16),
    InvalidBody(String),
    MissingField,
    NotANumber(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "elevation lookup disabled"),
            Self::Network(e) => write!(f, "request failed: {e}"),
            Self::Status(code) => write!(f, "service returned HTTP {code}"),
            Self::InvalidBody(e) => write!(f, "response is not JSON: {e}"),
            Self::MissingField => write!(f, "response has no 'elevation' field"),
            Self::NotANumber(v) => write!(f, "elevation '{v}' is not a number"),
        }
    }
}

pub trait ElevationSource {
    fn lookup(&self, latitude: f64, longitude: f64) -> ElevationLookup;
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> ElevationLookup,
{
    fn lookup(&self, latitude: f64, longitude: f64) -> ElevationLookup {
        self(latitude, longitude)
    }
}

/// Source used when lookups are switched off: every point keeps its own elevation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElevation;

impl ElevationSource for NoElevation {
    fn lookup(&self, _latitude: f64, _longitude: f64) -> ElevationLookup {
        ElevationLookup::Unresolved(UnresolvedReason::Disabled)
    }
}

/// Blocking HTTP client for `GET <endpoint>?lat=..&lon=..&outtype=JSON`.
pub struct HttpElevationSource {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpElevationSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        // One client for all points (connection reuse)
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ElevationSource for HttpElevationSource {
    fn lookup(&self, latitude: f64, longitude: f64) -> ElevationLookup {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("outtype", "JSON".to_string()),
            ])
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => return ElevationLookup::Unresolved(UnresolvedReason::Network(e.to_string())),
        };

        let status = response.status().as_u16();
        match response.text() {
            Ok(body) => {
                debug!(latitude, longitude, status, "elevation_response");
                interpret_response(status, &body)
            }
            Err(e) => ElevationLookup::Unresolved(UnresolvedReason::Network(e.to_string())),
        }
    }
}

/// Turn an elevation service response into a lookup outcome.
///
/// `elevation` may be a JSON number or a numeric string; the GSI service
/// answers `"-----"` where it has no data.
pub fn interpret_response(status: u16, body: &str) -> ElevationLookup {
    if status != 200 {
        return ElevationLookup::Unresolved(UnresolvedReason::Status(status));
    }

    let json: JsonValue = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return ElevationLookup::Unresolved(UnresolvedReason::InvalidBody(e.to_string())),
    };

    match json.get("elevation") {
        None | Some(JsonValue::Null) => ElevationLookup::Unresolved(UnresolvedReason::MissingField),
        Some(JsonValue::Number(n)) => match n.as_f64() {
            Some(v) => ElevationLookup::Resolved(v),
            None => ElevationLookup::Unresolved(UnresolvedReason::NotANumber(n.to_string())),
        },
        Some(JsonValue::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => ElevationLookup::Resolved(v),
            _ => ElevationLookup::Unresolved(UnresolvedReason::NotANumber(s.clone())),
        },
        Some(other) => ElevationLookup::Unresolved(UnresolvedReason::NotANumber(other.to_string())),
    }
}
