use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body of the prediction endpoint. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default)]
    pub ndvi_past: Option<f64>,
    #[serde(default)]
    pub ndvi_recent: Option<f64>,
    #[serde(default)]
    pub deforestation_change: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    /// Base64 PNG of the generated optical image for the past input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_past: Option<String>,
    /// Base64 PNG of the generated optical image for the recent input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_recent: Option<String>,
}

impl PredictionResult {
    /// Parse a response body. Only a JSON object is accepted, never a top-level array.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(serde_json::Error::invalid_type(unexpected(&value), &"a JSON object"));
        }
        serde_json::from_value(value)
    }

    /// Status text, treating an empty string as absent.
    pub fn status_text(&self) -> Option<&str> {
        non_empty(self.status.as_deref())
    }

    pub fn generated_past_payload(&self) -> Option<&str> {
        non_empty(self.generated_past.as_deref())
    }

    pub fn generated_recent_payload(&self) -> Option<&str> {
        non_empty(self.generated_recent.as_deref())
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
