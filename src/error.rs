use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("{0}")]
    Validation(String),
    #[error("failed to parse student information: {cause}")]
    Parse { cause: String },
    #[error("{message}: {cause}")]
    ExternalCapability {
        message: &'static str,
        cause: String,
    },
    #[error("report generation was cancelled")]
    Cancelled,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecordsError>;

impl RecordsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn parse(cause: impl Into<String>) -> Self {
        Self::Parse {
            cause: cause.into(),
        }
    }

    /// Validation failures are correctable by the caller; everything else
    /// needs a fresh attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = RecordsError::parse("response is missing `id`");
        assert_eq!(
            err.to_string(),
            "failed to parse student information: response is missing `id`"
        );

        let err = RecordsError::ExternalCapability {
            message: "failed to generate performance summary",
            cause: "exit status 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to generate performance summary: exit status 1"
        );
    }

    #[test]
    fn only_validation_is_recoverable() {
        assert!(RecordsError::validation("pick a class").is_recoverable());
        assert!(!RecordsError::parse("bad shape").is_recoverable());
        assert!(!RecordsError::Cancelled.is_recoverable());
    }
}
