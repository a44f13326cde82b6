use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Backend error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response from backend: {message}")]
    InvalidResponse { message: String },
}
