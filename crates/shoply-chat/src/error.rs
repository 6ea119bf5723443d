//! Error types for the conversational core.

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("LLM request failed: {0}")]
    LlmTransport(String),
    #[error("LLM request timed out after {0} seconds")]
    LlmTimeout(u64),
    #[error("LLM API returned {status}: {message}")]
    LlmStatus { status: u16, message: String },
    #[error("invalid LLM response: {0}")]
    LlmResponse(String),
    #[error("interaction log error: {0}")]
    LogWrite(String),
}

impl ChatError {
    /// Whether this error came from the LLM collaborator.
    ///
    /// Such failures end the current turn only; the session loop reports
    /// them and keeps reading input.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            ChatError::LlmTransport(_)
                | ChatError::LlmTimeout(_)
                | ChatError::LlmStatus { .. }
                | ChatError::LlmResponse(_)
        )
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::LogWrite(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::LogWrite(err.to_string())
    }
}
