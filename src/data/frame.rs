//! Decoding of live feed text frames.

use crate::core::constants::LOCATION_TYPE;
use crate::data::location::LocationUpdate;
use crate::Result;
use serde_json::Value;

/// What a single inbound text frame carried.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Empty payload, sent by the recorder to keep the socket alive
    KeepAlive,
    /// A parsed JSON payload. `label` and `location` may both be present.
    Payload {
        label: Option<String>,
        location: Option<LocationUpdate>,
    },
}

impl InboundFrame {
    /// Decodes one frame payload.
    ///
    /// Fails only on invalid JSON. A location part that does not decode, for
    /// example one missing its coordinates, is dropped while the label is
    /// kept. Payloads that are neither labels nor locations decode to an
    /// empty `Payload`.
    pub fn parse(payload: &str) -> Result<Self> {
        if payload.trim().is_empty() {
            return Ok(Self::KeepAlive);
        }

        let value: Value = serde_json::from_str(payload)?;

        let label = value
            .get("_label")
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())
            .map(str::to_string);

        let location = if value.get("_type").and_then(Value::as_str) == Some(LOCATION_TYPE) {
            match serde_json::from_value(value) {
                Ok(location) => Some(location),
                Err(e) => {
                    log::debug!("dropping malformed location: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::Payload { label, location })
    }

    pub fn into_location(self) -> Option<LocationUpdate> {
        match self {
            Self::Payload { location, .. } => location,
            Self::KeepAlive => None,
        }
    }
}
