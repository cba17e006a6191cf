use serde::Deserialize;
use serde_json::{Map, Value};

use super::scalar::{TransportCount, TransportFlag, TransportId};
use crate::domain::{ApiToken, FAILED_STATUS, GatewayResponse, SenderId};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which endpoint family produced a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// One JSON object from a single-message endpoint.
    Single,
    /// A JSON array from the multiple-message endpoint.
    Batch,
}

#[derive(Debug, Clone, Deserialize)]
struct SingleSmsJsonResponse {
    #[serde(default)]
    status: Option<TransportId>,
    #[serde(default)]
    charge: Option<TransportCount>,
    #[serde(default, rename = "messageId")]
    message_id: Option<TransportId>,
    #[serde(default)]
    scheduled: Option<TransportFlag>,
}

#[derive(Debug, Clone, Deserialize)]
struct BatchJsonEntry {
    #[serde(default)]
    status: Option<BatchJsonStatus>,
}

#[derive(Debug, Clone, Deserialize)]
struct BatchJsonStatus {
    #[serde(default)]
    error_status: Option<String>,
}

/// Body for the single-message endpoints: message fields plus auth.
pub fn encode_single_sms_body(
    mut fields: Map<String, Value>,
    token: &ApiToken,
    sender_id: Option<&SenderId>,
) -> Value {
    fields.insert(ApiToken::FIELD.to_owned(), token.as_str().into());
    if let Some(sender_id) = sender_id {
        fields.insert(SenderId::FIELD.to_owned(), sender_id.as_str().into());
    }
    Value::Object(fields)
}

/// Body for the multiple-message endpoint.
pub fn encode_batch_body(
    messages: Vec<Map<String, Value>>,
    token: &ApiToken,
    sender_id: Option<&SenderId>,
    batch_number: &str,
) -> Value {
    let mut auth = Map::new();
    auth.insert(ApiToken::FIELD.to_owned(), token.as_str().into());
    if let Some(sender_id) = sender_id {
        auth.insert("senderID".to_owned(), sender_id.as_str().into());
    }

    let mut payload = Map::new();
    payload.insert("batchNumber".to_owned(), batch_number.into());
    payload.insert(
        "messages".to_owned(),
        Value::Array(messages.into_iter().map(Value::Object).collect()),
    );

    let mut body = Map::new();
    body.insert("auth".to_owned(), Value::Object(auth));
    body.insert("payload".to_owned(), Value::Object(payload));
    Value::Object(body)
}

/// Interpret a gateway answer.
///
/// Any status other than 200 yields [`GatewayResponse::failed`] without looking at
/// the body.
pub fn decode_gateway_response(
    http_status: u16,
    body: &str,
    shape: ResponseShape,
) -> Result<GatewayResponse, TransportError> {
    if http_status != 200 {
        return Ok(GatewayResponse::failed());
    }

    match shape {
        ResponseShape::Single => decode_single_sms_json_response(body),
        ResponseShape::Batch => decode_batch_json_response(body),
    }
}

fn decode_single_sms_json_response(json: &str) -> Result<GatewayResponse, TransportError> {
    let parsed: SingleSmsJsonResponse = serde_json::from_str(json)?;
    Ok(GatewayResponse {
        status: parsed
            .status
            .and_then(TransportId::into_string)
            .unwrap_or_else(|| FAILED_STATUS.to_owned()),
        charge: parsed
            .charge
            .and_then(TransportCount::into_u64)
            .unwrap_or_default(),
        message_id: parsed.message_id.and_then(TransportId::into_string),
        scheduled: parsed.scheduled.is_some_and(TransportFlag::into_bool),
    })
}

fn decode_batch_json_response(json: &str) -> Result<GatewayResponse, TransportError> {
    let parsed: Vec<BatchJsonEntry> = serde_json::from_str(json)?;
    // Only the first entry decides the batch status.
    let status = parsed
        .into_iter()
        .next()
        .and_then(|entry| entry.status)
        .and_then(|status| status.error_status)
        .map(|status| status.to_uppercase())
        .unwrap_or_else(|| FAILED_STATUS.to_owned());

    Ok(GatewayResponse {
        status,
        ..GatewayResponse::failed()
    })
}
