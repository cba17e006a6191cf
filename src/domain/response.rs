use crate::domain::message::Message;

/// Status reported for any request the gateway did not accept.
pub const FAILED_STATUS: &str = "FAILED";

/// Normalized gateway answer for a single message or a whole batch.
///
/// For batch answers only `status` is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: String,
    pub charge: u64,
    pub message_id: Option<String>,
    pub scheduled: bool,
}

impl GatewayResponse {
    /// The response used for non-200 answers and transport failures.
    pub fn failed() -> Self {
        Self {
            status: FAILED_STATUS.to_owned(),
            charge: 0,
            message_id: None,
            scheduled: false,
        }
    }

    /// `true` unless the (case-insensitive) status is `FAILED`.
    pub fn is_ok(&self) -> bool {
        !self.status.eq_ignore_ascii_case(FAILED_STATUS)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Credits charged for the message.
    pub fn credits_used(&self) -> u64 {
        self.charge
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }
}

/// Why one message of a bulk send did not produce a gateway response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Result of sending one message of a bulk dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    /// Position of the message in the dispatched list.
    pub index: usize,
    pub message: Message,
    pub result: Result<GatewayResponse, SendFailure>,
}

impl MessageOutcome {
    pub fn response(&self) -> Option<&GatewayResponse> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&SendFailure> {
        self.result.as_ref().err()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStatus {
    /// Every message got an HTTP 200 answer.
    Success,
    /// Some messages failed.
    Partial,
    /// No message got an HTTP 200 answer.
    Failed,
}

impl DispatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Aggregated outcome of a concurrent bulk send.
///
/// `outcomes` are in completion order; use [`MessageOutcome::index`] to map an
/// outcome back to its source message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub status: DispatchStatus,
    pub total_count: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub outcomes: Vec<MessageOutcome>,
}

impl DispatchResult {
    pub fn from_outcomes(outcomes: Vec<MessageOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|it| it.result.is_ok()).count();
        let fail_count = outcomes.len() - success_count;
        let status = if fail_count == 0 {
            DispatchStatus::Success
        } else if success_count == 0 {
            DispatchStatus::Failed
        } else {
            DispatchStatus::Partial
        };

        Self {
            status,
            total_count: outcomes.len(),
            success_count,
            fail_count,
            outcomes,
        }
    }

    /// Outcomes sorted back into dispatch order.
    pub fn ordered(&self) -> Vec<&MessageOutcome> {
        let mut ordered = self.outcomes.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|it| it.index);
        ordered
    }
}

/// What a [`send`](crate::CodelClient::send) call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Exactly one message was built and sent on its own.
    Single(GatewayResponse),
    /// Messages were sent concurrently, one request each.
    Bulk(DispatchResult),
    /// Messages were sent as one batch request.
    Batch(GatewayResponse),
}

impl Dispatch {
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Single(response) | Self::Batch(response) => response.is_ok(),
            Self::Bulk(result) => result.status == DispatchStatus::Success,
        }
    }
}

/// Account balance answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Balance {
    /// SMS credits left on the account.
    Credits(i64),
    /// Any other answer, kept for inspection.
    Raw(serde_json::Value),
}
