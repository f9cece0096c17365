//! Error codes for terminal bridge failures.
//!
//! Codes follow the JSON-RPC 2.0 ranges:
//! - -32700 to -32600: reserved protocol errors
//! - -32000 to -32099: server errors (-32001 to -32010 are bridge errors)

// Protocol errors
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

// Terminal registry errors
pub const TERMINAL_NOT_FOUND: i32 = -32001;
pub const TERMINAL_EXISTS: i32 = -32002;
pub const TERMINAL_LIMIT: i32 = -32003;

// Engine errors
pub const ENGINE_ERROR: i32 = -32004;
pub const ENGINE_DISCONNECTED: i32 = -32005;
pub const TEARDOWN_TIMEOUT: i32 = -32006;
pub const INVALID_RESULT: i32 = -32007;

pub const GENERIC_ERROR: i32 = -32000;

/// Error category for programmatic handling by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Terminal id has no live registration
    NotFound,
    /// Rejected arguments or conflicting id
    InvalidInput,
    /// Capacity exhausted
    Busy,
    /// Engine or transport failure
    External,
    /// Bounded operation ran out of time
    Timeout,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Busy => "busy",
            ErrorCategory::External => "external",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found" => Ok(ErrorCategory::NotFound),
            "invalid_input" => Ok(ErrorCategory::InvalidInput),
            "busy" => Ok(ErrorCategory::Busy),
            "external" => Ok(ErrorCategory::External),
            "timeout" => Ok(ErrorCategory::Timeout),
            "internal" => Ok(ErrorCategory::Internal),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a failure with this code is transient.
///
/// Only transport-level conditions qualify; the bridge itself never retries.
pub fn is_retryable(code: i32) -> bool {
    matches!(code, ENGINE_DISCONNECTED | TEARDOWN_TIMEOUT)
}

pub fn category_for_code(code: i32) -> ErrorCategory {
    match code {
        TERMINAL_NOT_FOUND | METHOD_NOT_FOUND => ErrorCategory::NotFound,
        TERMINAL_EXISTS | INVALID_PARAMS | INVALID_REQUEST | PARSE_ERROR => {
            ErrorCategory::InvalidInput
        }
        TERMINAL_LIMIT => ErrorCategory::Busy,
        ENGINE_ERROR | ENGINE_DISCONNECTED | INVALID_RESULT => ErrorCategory::External,
        TEARDOWN_TIMEOUT => ErrorCategory::Timeout,
        _ => ErrorCategory::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_codes_are_in_server_range() {
        for code in [
            TERMINAL_NOT_FOUND,
            TERMINAL_EXISTS,
            TERMINAL_LIMIT,
            ENGINE_ERROR,
            ENGINE_DISCONNECTED,
            TEARDOWN_TIMEOUT,
            INVALID_RESULT,
        ] {
            assert!((-32099..=-32000).contains(&code), "code {code} out of range");
        }
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in [
            ErrorCategory::NotFound,
            ErrorCategory::InvalidInput,
            ErrorCategory::Busy,
            ErrorCategory::External,
            ErrorCategory::Timeout,
            ErrorCategory::Internal,
        ] {
            assert_eq!(category.as_str().parse::<ErrorCategory>(), Ok(category));
        }
        assert!("nope".parse::<ErrorCategory>().is_err());
    }

    #[test]
    fn test_category_for_code() {
        assert_eq!(category_for_code(TERMINAL_NOT_FOUND), ErrorCategory::NotFound);
        assert_eq!(category_for_code(TERMINAL_EXISTS), ErrorCategory::InvalidInput);
        assert_eq!(category_for_code(TERMINAL_LIMIT), ErrorCategory::Busy);
        assert_eq!(category_for_code(ENGINE_DISCONNECTED), ErrorCategory::External);
        assert_eq!(category_for_code(TEARDOWN_TIMEOUT), ErrorCategory::Timeout);
        assert_eq!(category_for_code(GENERIC_ERROR), ErrorCategory::Internal);
    }

    #[test]
    fn test_only_transport_codes_are_retryable() {
        assert!(is_retryable(ENGINE_DISCONNECTED));
        assert!(is_retryable(TEARDOWN_TIMEOUT));
        assert!(!is_retryable(TERMINAL_NOT_FOUND));
        assert!(!is_retryable(ENGINE_ERROR));
    }
}
