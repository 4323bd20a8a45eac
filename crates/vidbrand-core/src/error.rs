//! Error types module
//!
//! Two families of errors exist in vidbrand. `SessionError` covers
//! conversation misuse (wrong input order, input while a job runs); it is
//! always recoverable and answered with a re-prompt. `JobError` covers
//! pipeline-stage failures; each kind is terminal for that job but the
//! user may start over from scratch. Every variant carries a
//! machine-readable code and a user-facing message, so no error leaves
//! the pipeline boundary untranslated.

/// Terminal failure of one media job, tagged by the pipeline stage
/// that produced it.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("logo processing failed: {0}")]
    ImageProcessing(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("encode timed out after {timeout_secs}s")]
    EncodeTimeout { timeout_secs: u64 },

    #[error("output too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    OutputTooLarge { size_bytes: u64, limit_bytes: u64 },

    /// Job-workspace setup or teardown failure outside any named stage.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Machine-readable error code, stable for logs and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            JobError::Fetch(_) => "FETCH_ERROR",
            JobError::Probe(_) => "PROBE_ERROR",
            JobError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            JobError::Encode(_) => "ENCODE_ERROR",
            JobError::EncodeTimeout { .. } => "ENCODE_TIMEOUT",
            JobError::OutputTooLarge { .. } => "OUTPUT_TOO_LARGE",
            JobError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message sent back to the user over the transport. Internal detail
    /// (stderr tails, paths) stays in the log, not here.
    pub fn user_message(&self) -> String {
        match self {
            JobError::Fetch(_) => {
                "Could not download that video. Check the link and try again.".to_string()
            }
            JobError::Probe(_) => {
                "Could not read the video's dimensions. The file may be corrupt.".to_string()
            }
            JobError::ImageProcessing(_) => {
                "Could not process the logo image. Please send a different image.".to_string()
            }
            JobError::Encode(_) => {
                "Video processing failed. Please try again with another video.".to_string()
            }
            JobError::EncodeTimeout { .. } => {
                "Video processing timed out. Please send a shorter video.".to_string()
            }
            JobError::OutputTooLarge {
                size_bytes,
                limit_bytes,
            } => {
                format!(
                    "The branded video is too large to send ({} MB, limit {} MB). Try a shorter or lower-resolution video.",
                    size_bytes / (1024 * 1024),
                    limit_bytes / (1024 * 1024)
                )
            }
            JobError::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Internal(format!("IO error: {}", err))
    }
}

/// The conversation step a user skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingStep {
    SourceRef,
    Logo,
}

impl std::fmt::Display for MissingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingStep::SourceRef => write!(f, "source reference"),
            MissingStep::Logo => write!(f, "logo image"),
        }
    }
}

/// Conversation misuse. Recoverable; the caller re-prompts.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("out of order input: {missing} not yet provided")]
    OutOfOrderInput { missing: MissingStep },

    #[error("a job is already running for this user")]
    JobInProgress,
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::OutOfOrderInput {
                missing: MissingStep::SourceRef,
            } => "Please send the video link first.".to_string(),
            SessionError::OutOfOrderInput {
                missing: MissingStep::Logo,
            } => "Please send the logo image first.".to_string(),
            SessionError::JobInProgress => {
                "Your previous video is still processing. Please wait for it to finish."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            JobError::Fetch("x".into()),
            JobError::Probe("x".into()),
            JobError::ImageProcessing("x".into()),
            JobError::Encode("x".into()),
            JobError::EncodeTimeout { timeout_secs: 600 },
            JobError::OutputTooLarge {
                size_bytes: 60 * 1024 * 1024,
                limit_bytes: 50 * 1024 * 1024,
            },
            JobError::Internal("x".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_timeout_message_differs_from_encode_failure() {
        let timeout = JobError::EncodeTimeout { timeout_secs: 600 };
        let failure = JobError::Encode("exit status 1".into());
        assert_ne!(timeout.user_message(), failure.user_message());
        assert!(timeout.user_message().contains("shorter"));
    }

    #[test]
    fn test_too_large_message_reports_megabytes() {
        let err = JobError::OutputTooLarge {
            size_bytes: 60 * 1024 * 1024,
            limit_bytes: 50 * 1024 * 1024,
        };
        let msg = err.user_message();
        assert!(msg.contains("60 MB"));
        assert!(msg.contains("50 MB"));
    }

    #[test]
    fn test_session_error_messages_name_the_missing_step() {
        let err = SessionError::OutOfOrderInput {
            missing: MissingStep::SourceRef,
        };
        assert!(err.user_message().contains("video link"));

        let err = SessionError::OutOfOrderInput {
            missing: MissingStep::Logo,
        };
        assert!(err.user_message().contains("logo"));
    }
}
