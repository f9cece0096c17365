use std::time::Duration;

use termbridge_common::error_codes::{self, ErrorCategory};
use termbridge_protocol::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Terminal not found: {0}")]
    TerminalNotFound(String),

    #[error("Terminal already exists: {0}")]
    AlreadyExists(String),

    #[error("Terminal limit reached: maximum {0} terminals allowed")]
    LimitReached(usize),

    #[error("Engine call failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Engine returned an invalid result for {method}: {reason}")]
    InvalidResult { method: String, reason: String },

    #[error("Engine teardown of terminal {id} timed out after {after:?}")]
    TeardownTimedOut { id: String, after: Duration },
}

impl BridgeError {
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::TerminalNotFound(_) => error_codes::TERMINAL_NOT_FOUND,
            BridgeError::AlreadyExists(_) => error_codes::TERMINAL_EXISTS,
            BridgeError::LimitReached(_) => error_codes::TERMINAL_LIMIT,
            BridgeError::Engine(err) => err.code(),
            BridgeError::InvalidResult { .. } => error_codes::INVALID_RESULT,
            BridgeError::TeardownTimedOut { .. } => error_codes::TEARDOWN_TIMEOUT,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    pub fn is_retryable(&self) -> bool {
        error_codes::is_retryable(self.code())
    }

    /// True for local "no such handle" failures and the engine's equivalent.
    pub fn is_not_found(&self) -> bool {
        self.code() == error_codes::TERMINAL_NOT_FOUND
    }

    pub fn suggestion(&self) -> String {
        match self {
            BridgeError::TerminalNotFound(_) => {
                "The terminal was disposed or never created. Create a new terminal.".to_string()
            }
            BridgeError::AlreadyExists(id) => {
                format!("Dispose terminal '{}' first or choose another id.", id)
            }
            BridgeError::LimitReached(_) => {
                "Dispose unused terminals or raise TERMBRIDGE_MAX_TERMINALS.".to_string()
            }
            BridgeError::Engine(EngineError::Disconnected) => {
                "The engine connection closed. Reconnect and recreate terminals.".to_string()
            }
            BridgeError::Engine(_) | BridgeError::InvalidResult { .. } => {
                "Check that the engine script matches this bridge version.".to_string()
            }
            BridgeError::TeardownTimedOut { .. } => {
                "The engine did not answer; its instance may still be alive.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_and_category() {
        let err = BridgeError::TerminalNotFound("term-1".into());
        assert_eq!(err.to_string(), "Terminal not found: term-1");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_engine_not_found_counts_as_not_found() {
        let err = BridgeError::from(EngineError::rpc(
            error_codes::TERMINAL_NOT_FOUND,
            "Terminal not found: t",
        ));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_disconnect_is_retryable() {
        let err = BridgeError::from(EngineError::Disconnected);
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::External);
        assert!(err.suggestion().contains("Reconnect"));
    }

    #[test]
    fn test_limit_display() {
        let err = BridgeError::LimitReached(4);
        assert_eq!(
            err.to_string(),
            "Terminal limit reached: maximum 4 terminals allowed"
        );
        assert_eq!(err.code(), error_codes::TERMINAL_LIMIT);
    }
}
