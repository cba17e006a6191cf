//! Transport layer: HTTP and wire-format details (serialization/deserialization).

mod account;
mod scalar;
mod send_sms;

pub use account::{decode_balance_response, encode_balance_body};
pub use send_sms::{
    ResponseShape, decode_gateway_response, encode_batch_body, encode_single_sms_body,
};
