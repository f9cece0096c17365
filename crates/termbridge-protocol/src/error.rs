use thiserror::Error;

use crate::error_codes::{self, ErrorCategory};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode engine message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Engine error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Engine disconnected")]
    Disconnected,

    #[error("Invalid engine message: {0}")]
    InvalidResponse(String),

    #[error("Engine frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },
}

impl EngineError {
    pub fn rpc(code: i32, message: impl Into<String>) -> Self {
        EngineError::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            EngineError::Rpc { code, .. } => *code,
            EngineError::Io(_) | EngineError::Disconnected => error_codes::ENGINE_DISCONNECTED,
            EngineError::Serialization(_) | EngineError::InvalidResponse(_) => {
                error_codes::INVALID_RESULT
            }
            EngineError::FrameTooLarge { .. } => error_codes::ENGINE_ERROR,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    pub fn is_retryable(&self) -> bool {
        error_codes::is_retryable(self.code())
    }
}
