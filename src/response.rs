use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{RequestDescriptor, RequestError, RequestId, Result};

/// Body of a response, decoded according to its declared shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Json(JsonValue),
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Json(_) => &[],
            Self::Text(value) => value.as_bytes(),
            Self::Bytes(value) => value,
        }
    }

    /// Deserializes a JSON payload into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|err| RequestError::Decode(format!("unexpected payload shape: {err}"))),
            Self::Text(_) | Self::Bytes(_) => Err(RequestError::Decode(
                "payload is not structured data".to_owned(),
            )),
        }
    }
}

/// Transport-level successful response.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Payload,
    /// Descriptor that produced this response, after `on_request`.
    pub request: RequestDescriptor,
    pub request_id: RequestId,
}

impl RawResponse {
    /// The body as JSON, or `Null` for non-JSON shapes.
    pub fn json(&self) -> &JsonValue {
        static NULL: JsonValue = JsonValue::Null;
        self.body.as_json().unwrap_or(&NULL)
    }
}
