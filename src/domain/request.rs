use std::collections::BTreeMap;

use crate::domain::message::Message;
use crate::domain::value::PhoneNumber;

/// Maximum number of in-flight requests during a concurrent bulk send.
pub const BULK_CONCURRENCY: usize = 4;

/// Recipients of a [`send`](crate::CodelClient::send) call, in input order.
///
/// A single string containing commas is split into several receivers. Entries are
/// trimmed; blank entries are kept here so positional message lists stay aligned and
/// are skipped when messages are built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Receivers(Vec<String>);

impl Receivers {
    /// Split a comma-separated receiver list.
    pub fn parse(value: &str) -> Self {
        Self(value.split(',').map(|it| it.trim().to_owned()).collect())
    }

    pub fn new<I, S>(receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            receivers
                .into_iter()
                .map(|it| it.as_ref().trim().to_owned())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Receivers {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Receivers {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Vec<String>> for Receivers {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<Vec<&str>> for Receivers {
    fn from(value: Vec<&str>) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<[&str; N]> for Receivers {
    fn from(value: [&str; N]) -> Self {
        Self::new(value)
    }
}

/// Message text for each receiver of a [`send`](crate::CodelClient::send) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// One text shared by every receiver.
    Shared(String),
    /// Text keyed by receiver, as given or in canonical form.
    ByReceiver(BTreeMap<String, String>),
    /// Text by receiver position; must have exactly one entry per receiver.
    ByIndex(Vec<String>),
}

impl MessageContent {
    /// Whether no text at all was provided.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Shared(text) => text.trim().is_empty(),
            Self::ByReceiver(texts) => texts.is_empty(),
            Self::ByIndex(texts) => texts.is_empty(),
        }
    }

    /// Resolve the text for the receiver at `index`.
    pub(crate) fn text_for(&self, index: usize, receiver: &str, phone: &PhoneNumber) -> &str {
        let text = match self {
            Self::Shared(text) => Some(text),
            Self::ByReceiver(texts) => texts.get(receiver).or_else(|| {
                texts
                    .iter()
                    .find(|(key, _)| PhoneNumber::normalize(key).is_ok_and(|it| &it == phone))
                    .map(|(_, text)| text)
            }),
            Self::ByIndex(texts) => texts.get(index),
        };
        text.map(String::as_str).unwrap_or_default()
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Shared(value.to_owned())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Shared(value)
    }
}

impl From<Vec<String>> for MessageContent {
    fn from(value: Vec<String>) -> Self {
        Self::ByIndex(value)
    }
}

impl From<Vec<&str>> for MessageContent {
    fn from(value: Vec<&str>) -> Self {
        Self::ByIndex(value.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for MessageContent {
    fn from(value: [&str; N]) -> Self {
        Self::ByIndex(value.into_iter().map(str::to_owned).collect())
    }
}

impl From<BTreeMap<String, String>> for MessageContent {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::ByReceiver(value)
    }
}

/// Value produced by a per-message customization callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Customized {
    /// Plain text, sent to the receiver the callback was invoked for.
    Text(String),
    /// A complete message. If it has no destination, the receiver is filled in.
    Message(Message),
}

impl From<&str> for Customized {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Customized {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Message> for Customized {
    fn from(value: Message) -> Self {
        Self::Message(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How a multi-receiver send reaches the gateway.
pub enum BulkStrategy {
    /// One request per message against the single-message endpoint, at most
    /// [`BULK_CONCURRENCY`] in flight.
    #[default]
    Concurrent,
    /// One request carrying every message to the multiple-message endpoint.
    Batch,
}
