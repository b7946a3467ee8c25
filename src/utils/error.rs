use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Validation rejected for {field}: {reason}")]
    ValidationRejected { field: String, reason: String },

    #[error("Malformed signature payload: {reason}")]
    MalformedSignaturePayload { reason: String },

    #[error("Signature decode failed: {0}")]
    DecodeFailure(#[from] base64::DecodeError),

    #[error("Persistence IO failure: {0}")]
    PersistenceIoFailure(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("User id '{user_id}' cannot be used in file names")]
    UnsafeUserId { user_id: String },

    #[error("Delivery failed: {message}")]
    DeliveryFailure { message: String },

    #[error("Session incomplete, missing field: {field}")]
    IncompleteSession { field: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

impl IntakeError {
    pub fn rejected(field: &str, reason: impl Into<String>) -> Self {
        IntakeError::ValidationRejected {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        IntakeError::MalformedSignaturePayload {
            reason: reason.into(),
        }
    }

    /// Errors the user can fix by sending the step again. Everything raised
    /// while handling a chat event is recoverable; only configuration errors
    /// stop the process.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            IntakeError::ConfigError { .. }
                | IntakeError::InvalidConfigValueError { .. }
                | IntakeError::MissingConfigError { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IntakeError::ValidationRejected { reason, .. } => format!("❌ {}", reason),
            IntakeError::MalformedSignaturePayload { .. } => {
                "❌ Unexpected data from the signature app. Please sign again.".to_string()
            }
            IntakeError::DecodeFailure(_)
            | IntakeError::PersistenceIoFailure(_)
            | IntakeError::SerializationError(_)
            | IntakeError::IncompleteSession { .. } => {
                "❌ Failed to save the signature. Please try again.".to_string()
            }
            IntakeError::UnsafeUserId { .. } => {
                "❌ This chat cannot be used to fill in the form.".to_string()
            }
            IntakeError::DeliveryFailure { message } => format!("Delivery failed: {}", message),
            IntakeError::ConfigError { message } => format!("Configuration error: {}", message),
            IntakeError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid value for '{}': {}", field, reason)
            }
            IntakeError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_not_recoverable() {
        let err = IntakeError::ConfigError {
            message: "bad".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(IntakeError::rejected("phone", "wrong format").is_recoverable());
        assert!(IntakeError::malformed("no type").is_recoverable());
    }

    #[test]
    fn test_rejection_message_carries_reason() {
        let err = IntakeError::rejected("iin", "IIN must contain 12 digits");
        assert_eq!(err.user_friendly_message(), "❌ IIN must contain 12 digits");
    }
}
