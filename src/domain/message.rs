use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use crate::domain::validation::ValidationError;
use crate::domain::value::{MessageReference, MessageText, PhoneNumber, Validity};

/// Wire field carrying the serialization date (`YYYYMMDDhhmmss`).
pub const MESSAGE_DATE_FIELD: &str = "messageDate";
/// Wire field carrying the scheduled send time (`hh:mm`).
pub const SEND_DATE_TIME_FIELD: &str = "sendDateTime";

const MESSAGE_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
const SEND_DATE_TIME_FORMAT: &str = "%H:%M";

/// One outbound SMS.
///
/// Messages are plain values: every builder method consumes `self` and returns
/// a new message, so nothing is ever shared between two sends.
///
/// A message may be created without a destination with [`Message::unaddressed`];
/// such a message cannot be serialized until it is [addressed](Message::addressed_to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    destination: Option<PhoneNumber>,
    text: MessageText,
    reference: MessageReference,
    timestamp: DateTime<Local>,
    validity: Validity,
}

impl Message {
    /// Create a message, normalizing `destination`.
    ///
    /// The reference defaults to a freshly generated one, the timestamp to now and
    /// the validity to [`Validity::DEFAULT`].
    pub fn new(
        destination: impl AsRef<str>,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let destination = PhoneNumber::normalize(destination)?;
        Ok(Self::to(destination, MessageText::new(text)?))
    }

    /// Create a message for an already normalized destination.
    pub fn to(destination: PhoneNumber, text: MessageText) -> Self {
        Self {
            destination: Some(destination),
            ..Self::draft(text)
        }
    }

    /// Create a message without a destination.
    pub fn unaddressed(text: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self::draft(MessageText::new(text)?))
    }

    fn draft(text: MessageText) -> Self {
        Self {
            destination: None,
            text,
            reference: MessageReference::generate(),
            timestamp: Local::now(),
            validity: Validity::default(),
        }
    }

    pub fn with_reference(self, reference: MessageReference) -> Self {
        Self { reference, ..self }
    }

    /// Set the point in time the gateway should send the message at.
    pub fn with_timestamp(self, timestamp: DateTime<Local>) -> Self {
        Self { timestamp, ..self }
    }

    pub fn with_validity(self, validity: Validity) -> Self {
        Self { validity, ..self }
    }

    /// Return the same message addressed to `destination`.
    pub fn addressed_to(self, destination: PhoneNumber) -> Self {
        Self {
            destination: Some(destination),
            ..self
        }
    }

    pub fn destination(&self) -> Option<&PhoneNumber> {
        self.destination.as_ref()
    }

    pub fn text(&self) -> &MessageText {
        &self.text
    }

    pub fn reference(&self) -> &MessageReference {
        &self.reference
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    /// Gateway wire fields for this message.
    ///
    /// `messageDate` is the date of serialization, not of creation.
    ///
    /// Errors:
    /// - [`ValidationError::Empty`] if the message has no destination.
    pub fn serialize(&self) -> Result<Map<String, Value>, ValidationError> {
        self.serialize_at(Local::now())
    }

    pub(crate) fn serialize_at(
        &self,
        now: DateTime<Local>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let destination = self.destination.as_ref().ok_or(ValidationError::Empty {
            field: PhoneNumber::FIELD,
        })?;

        let mut fields = Map::new();
        fields.insert(PhoneNumber::FIELD.to_owned(), destination.as_str().into());
        fields.insert(MessageText::FIELD.to_owned(), self.text.as_str().into());
        fields.insert(
            MessageReference::FIELD.to_owned(),
            self.reference.as_str().into(),
        );
        fields.insert(
            MESSAGE_DATE_FIELD.to_owned(),
            now.format(MESSAGE_DATE_FORMAT).to_string().into(),
        );
        fields.insert(Validity::FIELD.to_owned(), self.validity.as_str().into());
        fields.insert(
            SEND_DATE_TIME_FIELD.to_owned(),
            self.timestamp
                .format(SEND_DATE_TIME_FORMAT)
                .to_string()
                .into(),
        );
        Ok(fields)
    }
}
