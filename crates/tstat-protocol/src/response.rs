//! Server response rendering.
//!
//! Responses are unframed: the exact bytes below go on the wire with no
//! trailing newline, and clients read whatever one `read` returns. Deployed
//! clients depend on these exact bytes; the integration tests assert them
//! byte-for-byte.

use std::fmt;

/// Prefix carried by every server reply.
pub const RESPONSE_PREFIX: &str = "SERVER> ";

/// A reply to one client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Acknowledges a parameter write: `SERVER> OK`.
    Ok,

    /// Reports a queried value: `SERVER> <integer>`.
    Value(i64),
}

impl Response {
    /// Renders the exact wire bytes for this response.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "{RESPONSE_PREFIX}OK"),
            Self::Value(value) => write!(f, "{RESPONSE_PREFIX}{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_bytes() {
        assert_eq!(Response::Ok.render(), "SERVER> OK");
    }

    #[test]
    fn test_value_bytes() {
        assert_eq!(Response::Value(65).render(), "SERVER> 65");
        assert_eq!(Response::Value(0).render(), "SERVER> 0");
        assert_eq!(Response::Value(-5).render(), "SERVER> -5");
    }

    #[test]
    fn test_no_trailing_newline() {
        assert!(!Response::Ok.render().ends_with('\n'));
        assert!(!Response::Value(100).render().ends_with('\n'));
    }
}
