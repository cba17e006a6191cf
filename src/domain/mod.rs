//! Domain layer: strong types with validation and invariants (no I/O).

mod message;
mod request;
mod response;
mod validation;
mod value;

pub use message::{MESSAGE_DATE_FIELD, Message, SEND_DATE_TIME_FIELD};
pub use request::{BULK_CONCURRENCY, BulkStrategy, Customized, MessageContent, Receivers};
pub use response::{
    Balance, Dispatch, DispatchResult, DispatchStatus, FAILED_STATUS, GatewayResponse,
    MessageOutcome, SendFailure,
};
pub use validation::ValidationError;
pub use value::{
    ApiToken, MessageReference, MessageText, Password, PhoneNumber, SenderId, Username, Validity,
};
