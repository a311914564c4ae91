//! Query envelope codec.
//!
//! Wire form on both legs: `{"operationName": "...", "query": "..."}`.
//! Inbound `operationName` may be missing or `null`; `query` is required.
//! Unknown fields (e.g. `variables`) are ignored.

use serde::{Deserialize, Deserializer, Serialize};

/// JSON media type used for dispatch.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A decoded inbound envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "operationName", default, deserialize_with = "null_as_empty")]
    pub operation_name: String,
    pub query: String,
}

/// Borrowed outbound envelope, encoded without copying the rewritten query.
#[derive(Debug, Serialize)]
pub struct OutboundEnvelope<'a> {
    #[serde(rename = "operationName")]
    pub operation_name: &'a str,
    pub query: &'a str,
}

impl Envelope {
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl OutboundEnvelope<'_> {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
