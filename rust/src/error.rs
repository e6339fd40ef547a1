use thiserror::Error;

/// Message fragment the provider returns when the selected key cannot be
/// resolved on its side.
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

#[derive(Debug, Error)]
pub enum LogoError {
    #[error("no API key is selected")]
    KeyUnavailable,

    #[error("API key rejected: {0}")]
    CredentialRejected(String),

    #[error("No image data found in response.")]
    NoImageData,

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode image payload: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("a logo is already being generated")]
    Busy,

    #[error("generation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogoError {
    /// True when the provider could not locate or authorize the selected key.
    ///
    /// Structured rejections are classified when the response is parsed; the
    /// message match covers errors that reach us without a status.
    pub fn is_credential_rejection(&self) -> bool {
        match self {
            Self::CredentialRejected(_) => true,
            other => other.to_string().contains(ENTITY_NOT_FOUND),
        }
    }
}

pub type Result<T> = std::result::Result<T, LogoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_rejection_is_credential_failure() {
        let err = LogoError::CredentialRejected("API key not valid".into());
        assert!(err.is_credential_rejection());
    }

    #[test]
    fn entity_not_found_message_is_credential_failure() {
        let err = LogoError::Api {
            status: 500,
            message: "Requested entity was not found.".into(),
        };
        assert!(err.is_credential_rejection());
    }

    #[test]
    fn other_failures_are_not_credential_failures() {
        assert!(!LogoError::NoImageData.is_credential_rejection());
        assert!(!LogoError::Api {
            status: 503,
            message: "The model is overloaded.".into(),
        }
        .is_credential_rejection());
    }

    #[test]
    fn api_error_displays_provider_message_verbatim() {
        let err = LogoError::Api {
            status: 400,
            message: "Invalid image size".into(),
        };
        assert_eq!(err.to_string(), "Invalid image size");
    }
}
