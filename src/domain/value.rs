use std::fmt;

use crate::domain::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Codel API token (`token`).
///
/// Invariant: non-empty after trimming.
pub struct ApiToken(String);

impl ApiToken {
    /// JSON field name used by Codel (`token`).
    pub const FIELD: &'static str = "token";

    /// Create a validated [`ApiToken`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Codel account username.
///
/// Invariant: non-empty after trimming.
pub struct Username(String);

impl Username {
    pub const FIELD: &'static str = "username";

    /// Create a validated [`Username`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
/// Codel account password.
///
/// Invariant: must not be empty (whitespace is preserved and allowed).
pub struct Password(String);

impl Password {
    pub const FIELD: &'static str = "password";

    /// Create a validated [`Password`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Custom sender identifier (`sender_id`).
///
/// Invariant: non-empty after trimming. The value must be approved on your Codel account.
pub struct SenderId(String);

impl SenderId {
    /// JSON field name used by the single-message endpoint (`sender_id`).
    pub const FIELD: &'static str = "sender_id";

    /// Create a validated [`SenderId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// SMS message text (`messageText`).
///
/// Invariant: non-empty after trimming. The original value (including whitespace) is preserved.
pub struct MessageText(String);

impl MessageText {
    /// JSON field name used by Codel (`messageText`).
    pub const FIELD: &'static str = "messageText";

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Client-side message reference (`messageReference`).
///
/// Invariant: non-empty after trimming.
pub struct MessageReference(String);

impl MessageReference {
    pub const FIELD: &'static str = "messageReference";

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Generate a fresh, unique reference.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// How long the gateway keeps retrying delivery (`messageValidity`), as `HH:MM`.
pub struct Validity(String);

impl Validity {
    pub const FIELD: &'static str = "messageValidity";

    /// Gateway default of three hours.
    pub const DEFAULT: &'static str = "03:00";

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Validity {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Phone number in the gateway's canonical form: `263` followed by nine digits.
///
/// Accepted inputs are the canonical form itself, the same with a leading `+`,
/// a ten-digit national number with a trunk prefix (`0771000000`), or the bare
/// nine-digit subscriber number (`771000000`). This is a fixed country-code
/// scheme, not general E.164 parsing.
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// JSON field name used by Codel (`destination`).
    pub const FIELD: &'static str = "destination";

    /// Country code prepended to nine-digit subscriber numbers.
    pub const COUNTRY_CODE: &'static str = "263";

    /// Length of every canonical number.
    pub const CANONICAL_LEN: usize = 12;

    /// Normalize a raw phone string into canonical form.
    pub fn normalize(input: impl AsRef<str>) -> Result<Self, ValidationError> {
        let input = input.as_ref();
        let trimmed = input.trim();
        let mut number = trimmed.strip_prefix('+').unwrap_or(trimmed).to_owned();

        if number.len() == 10 {
            // Drop the trunk prefix.
            number.remove(0);
        }
        if number.len() == 9 {
            number.insert_str(0, Self::COUNTRY_CODE);
        }

        if number.len() != Self::CANONICAL_LEN || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidPhoneNumber {
                input: input.to_owned(),
            });
        }
        Ok(Self(number))
    }

    /// Canonical value as sent to Codel.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
