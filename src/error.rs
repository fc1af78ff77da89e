use thiserror::Error;

pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload document. Please try again.";
pub const QUESTION_FAILED_MESSAGE: &str = "Failed to get answer. Please try again.";
pub const ANSWER_FAILED_MESSAGE: &str = "Failed to generate AI response. Please try again.";
pub const SUMMARY_FAILED_MESSAGE: &str = "Failed to generate document summary. Please try again.";

#[derive(Error, Debug)]
pub enum DocQaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// User-facing upload failure.
    #[error("{0}")]
    Upload(String),

    /// User-facing question failure.
    #[error("{0}")]
    Question(String),

    /// User-facing completion failure.
    #[error("{0}")]
    Completion(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocQaError {
    pub fn upload_failed() -> Self {
        Self::Upload(UPLOAD_FAILED_MESSAGE.to_string())
    }

    pub fn question_failed() -> Self {
        Self::Question(QUESTION_FAILED_MESSAGE.to_string())
    }

    /// True for the wrapped, display-ready variants.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Upload(_) | Self::Question(_) | Self::Completion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DocQaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages_display_verbatim() {
        assert_eq!(
            DocQaError::upload_failed().to_string(),
            "Failed to upload document. Please try again."
        );
        assert_eq!(
            DocQaError::question_failed().to_string(),
            "Failed to get answer. Please try again."
        );
        assert!(DocQaError::question_failed().is_user_facing());
    }

    #[test]
    fn test_api_error_is_not_user_facing() {
        let err = DocQaError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - unavailable");
        assert!(!err.is_user_facing());
    }
}
