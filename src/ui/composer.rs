//! The text input of the widget.

use crate::error::ValidationError;

/// Current value of the message input field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    value: String,
}

impl Composer {
    /// Raw value as typed.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Empty the field.
    pub fn clear(&mut self) {
        self.value.clear();
    }
}

/// Trim a submission and reject it if nothing is left.
pub fn validate_input(raw: &str) -> Result<&str, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        Err(ValidationError)
    } else {
        Ok(text)
    }
}
