/// Why an exchange with the inference endpoint produced no reply.
///
/// Every variant ends up as an error entry in the transcript; none of them
/// escape the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The request never completed (DNS, connect, reset, timeout in the transport)
    #[error("request failed: {0}")]
    Transport(String),
    /// The endpoint answered with a non-2xx status
    #[error("request failed with status {0}")]
    Status(u16),
    #[error("response body is not valid JSON: {0}")]
    InvalidBody(String),
    #[error("response body has no \"response\" field")]
    MissingResponse,
    /// The task driving the request panicked or was cancelled
    #[error("request interrupted: {0}")]
    Interrupted(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_names_code() {
        assert_eq!(
            ChatError::Status(500).to_string(),
            "request failed with status 500"
        );
    }

    #[test]
    fn test_transport_message_keeps_cause() {
        let err = ChatError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "request failed: connection refused");
    }
}
