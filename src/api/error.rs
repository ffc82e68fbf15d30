use std::time::Duration;
use thiserror::Error;

/// Typed outcome of a prediction-backend request. The gateway never lets a
/// transport error escape as anything else; retry policy belongs to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no response from prediction backend")]
    NetworkFailure,

    #[error("prediction backend returned HTTP {status}")]
    BackendUnavailable { status: u16 },

    #[error("malformed response from prediction backend")]
    InvalidPayload,

    #[error("prediction backend timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Message shown in the dashboard error banner. Cold-start statuses get a
    /// retriable hint: the backend sleeps on its free-tier host and answers
    /// 502/503 while it warms up.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::BackendUnavailable { status } if matches!(status, 502 | 503 | 504) => {
                format!(
                    "Prediction service is starting up (HTTP {status}), try again in a minute"
                )
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_hint() {
        let e = FetchError::BackendUnavailable { status: 503 };
        assert!(e.user_message().contains("starting up"));
        assert!(e.user_message().contains("503"));
    }

    #[test]
    fn test_hard_status_has_no_hint() {
        let e = FetchError::BackendUnavailable { status: 404 };
        assert!(!e.user_message().contains("starting up"));
    }
}
