use serde::Serialize;
use thiserror::Error;

/// A single rejected input field.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Collects field-level errors so a request reports every problem at once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<ValidationError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.0.push(ValidationError::new(field, message));
        }
    }

    /// Keep the value of `result`, recording its error if it failed.
    pub fn take<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.0.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_failed_check() {
        let mut errors = FieldErrors::new();
        errors.check(true, "name", "Name is required");
        errors.check(false, "email", "Valid email is required");
        errors.check(false, "password", "Password too short");

        let list = errors.finish().unwrap_err();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].field, "email");
        assert_eq!(list[1].to_string(), "password: Password too short");
    }

    #[test]
    fn take_records_err_and_keeps_ok() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.take::<u32>(Ok(3)), Some(3));
        assert_eq!(
            errors.take::<u32>(Err(ValidationError::new("rating", "out of range"))),
            None
        );
        assert!(!errors.is_empty());
    }
}
