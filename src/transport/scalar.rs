use serde::Deserialize;
use serde_json::Value;

/// Count returned by Codel as a JSON number or a numeric JSON string.
///
/// Fractional values are truncated; anything else reads as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransportCount {
    Int(u64),
    Float(f64),
    String(String),
    Other(Value),
}

impl TransportCount {
    pub fn into_u64(self) -> Option<u64> {
        match self {
            Self::Int(value) => Some(value),
            Self::Float(value) => float_to_u64(value),
            Self::String(value) => {
                let value = value.trim();
                value
                    .parse::<u64>()
                    .ok()
                    .or_else(|| value.parse::<f64>().ok().and_then(float_to_u64))
            }
            Self::Other(_) => None,
        }
    }
}

fn float_to_u64(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

/// Flag returned by Codel as a JSON bool, a 0/1 number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransportFlag {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Other(Value),
}

impl TransportFlag {
    pub fn into_bool(self) -> bool {
        match self {
            Self::Bool(value) => value,
            Self::Number(value) => value.as_f64().is_some_and(|value| value != 0.0),
            Self::String(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ),
            Self::Other(_) => false,
        }
    }
}

/// Identifier returned by Codel as a JSON string or a JSON number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransportId {
    String(String),
    Number(serde_json::Number),
    Other(Value),
}

impl TransportId {
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::String(value) => Some(value),
            Self::Number(value) => Some(value.to_string()),
            Self::Other(_) => None,
        }
    }
}
