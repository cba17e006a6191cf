use serde_json::{Map, Value};

use crate::domain::{ApiToken, Balance};

const BALANCE_FIELD: &str = "sms_credit_balance";

pub fn encode_balance_body(token: &ApiToken) -> Value {
    let mut body = Map::new();
    body.insert(ApiToken::FIELD.to_owned(), token.as_str().into());
    Value::Object(body)
}

/// Interpret a balance answer.
///
/// Only a 200 answer with an integer `sms_credit_balance` is a [`Balance::Credits`];
/// everything else is handed back as [`Balance::Raw`], with non-JSON bodies kept as
/// a JSON string.
pub fn decode_balance_response(http_status: u16, body: &str) -> Balance {
    let parsed =
        serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_owned()));

    let credits = parsed.get(BALANCE_FIELD).and_then(Value::as_i64);
    match credits {
        Some(credits) if http_status == 200 => Balance::Credits(credits),
        _ => Balance::Raw(parsed),
    }
}
