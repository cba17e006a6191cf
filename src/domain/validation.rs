use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    InvalidPhoneNumber { input: String },
    MalformedConfig { reason: &'static str },
    ReceiverMessageMismatch { receivers: usize, messages: usize },
    NoMessages,
    InvalidCustomization { receiver: String, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidPhoneNumber { input } => write!(
                f,
                "invalid phone number: {input} (expected the format 263XXXXXXXXX)"
            ),
            Self::MalformedConfig { reason } => write!(f, "malformed config: {reason}"),
            Self::ReceiverMessageMismatch {
                receivers,
                messages,
            } => write!(
                f,
                "number of receivers and messages do not match: {receivers} receivers, {messages} messages"
            ),
            Self::NoMessages => write!(f, "no messages to send"),
            Self::InvalidCustomization { receiver, reason } => {
                write!(f, "message customization failed for {receiver}: {reason}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
