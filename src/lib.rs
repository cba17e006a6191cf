//! Typed Rust client for the Codel bulk SMS HTTP API.
//!
//! The crate is split into a domain layer of strong types (phone number
//! normalization, immutable messages, gateway responses), a transport layer for
//! the gateway's JSON wire format, and a small client layer that routes sends to
//! the single-message, concurrent bulk, or batch endpoints.
//!
//! ```rust,no_run
//! use codel_sms::{CodelClient, Credentials, Dispatch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), codel_sms::CodelError> {
//!     let client = CodelClient::new(Credentials::token("...")?);
//!     match client.send("0771000001,0772000002", "hello").await? {
//!         Dispatch::Bulk(result) => println!("{} sent", result.success_count),
//!         other => println!("ok: {}", other.is_ok()),
//!     }
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
mod transport;

pub use client::{BoxError, CodelClient, CodelClientBuilder, CodelError, Credentials, Customizer};
pub use domain::{
    ApiToken, BULK_CONCURRENCY, Balance, BulkStrategy, Customized, Dispatch, DispatchResult,
    DispatchStatus, GatewayResponse, Message, MessageContent, MessageOutcome, MessageReference,
    MessageText, Password, PhoneNumber, Receivers, SendFailure, SenderId, Username,
    ValidationError, Validity,
};
