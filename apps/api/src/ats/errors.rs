use thiserror::Error;

/// Failure of an upload/analysis session. The display string is the single
/// user-facing message shown by the checker.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Analysis(String),

    #[error("Analysis timed out. Please try again.")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum UploadError {
    /// The storage service answered with an error status.
    #[error("Upload rejected by storage: {0}")]
    Rejected(String),

    /// The request never got a response.
    #[error("Upload failed: {0}")]
    Transport(String),

    #[error("Upload timed out. Please try again.")]
    TimedOut,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Analysis returned an empty result")]
    Empty,

    #[error("Analysis returned an unreadable result: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<UploadError> for SessionError {
    fn from(err: UploadError) -> Self {
        SessionError::Upload(err.to_string())
    }
}

impl From<AnalysisError> for SessionError {
    fn from(err: AnalysisError) -> Self {
        let message = match err {
            AnalysisError::Api { message, .. } if !message.trim().is_empty() => message,
            AnalysisError::Api { status, .. } => {
                format!("Analysis failed with status {status}. Please try again.")
            }
            AnalysisError::Http(_) => {
                "Could not reach the analysis service. Please try again.".to_string()
            }
            AnalysisError::Empty => "The analysis service returned no result.".to_string(),
            AnalysisError::Malformed(_) => {
                "The analysis service returned an unreadable result.".to_string()
            }
        };
        SessionError::Analysis(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            SessionError::Timeout.to_string(),
            "Analysis timed out. Please try again."
        );
    }

    #[test]
    fn test_api_message_passed_through() {
        let err: SessionError = AnalysisError::Api {
            status: 422,
            message: "Resume text could not be extracted".to_string(),
        }
        .into();
        assert_eq!(
            err,
            SessionError::Analysis("Resume text could not be extracted".to_string())
        );
    }

    #[test]
    fn test_blank_api_message_gets_status() {
        let err: SessionError = AnalysisError::Api {
            status: 500,
            message: " ".to_string(),
        }
        .into();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_upload_error_message() {
        let err: SessionError = UploadError::Transport("connection reset".to_string()).into();
        assert_eq!(err.to_string(), "Upload failed: connection reset");

        let err: SessionError = UploadError::TimedOut.into();
        assert_eq!(err, SessionError::Upload("Upload timed out. Please try again.".to_string()));
    }
}
