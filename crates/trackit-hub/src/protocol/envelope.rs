//! Outbound broadcast envelope

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Envelope wrapping every broadcast frame
///
/// Serializes as `{"type": <kind>, "data": <payload>, "timestamp": <RFC3339>}`.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize + ?Sized> {
    /// Event kind, e.g. `task.updated`
    #[serde(rename = "type")]
    pub kind: &'a str,

    /// Opaque event payload
    pub data: &'a T,

    /// RFC3339 creation time (UTC)
    pub timestamp: String,
}

impl<'a, T: Serialize + ?Sized> Envelope<'a, T> {
    /// Create an envelope stamped with the current time
    #[must_use]
    pub fn new(kind: &'a str, data: &'a T) -> Self {
        Self::at(kind, data, Utc::now())
    }

    /// Create an envelope stamped with the given time
    #[must_use]
    pub fn at(kind: &'a str, data: &'a T, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            data,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Serialize to the JSON text sent on the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
