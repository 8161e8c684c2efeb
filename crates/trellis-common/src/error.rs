//! Error types for port and exposure resolution
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant includes contextual information such as the offending
//! input string or binding, and the full list of collected violations.

use thiserror::Error;

/// Main error type for Trellis spec and resolution operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed compact port/binding string
    #[error("invalid port syntax [{input}]: {message}")]
    Syntax {
        /// The input string that failed to parse
        input: String,
        /// Description of what's invalid
        message: String,
    },

    /// A binding or listener resolves to more than one service, protocol,
    /// or port, making the exposure plan non-deterministic
    #[error("ambiguous port binding [{binding}]: {message}")]
    Ambiguity {
        /// Compact form of the binding or listener involved
        binding: String,
        /// Description of the conflicting resolutions
        message: String,
    },

    /// Structural invariant violations over a built port set, collected
    /// across the whole set so a user sees every problem in one pass
    #[error("invalid port configuration: {}", .violations.join("; "))]
    Invariant {
        /// Every violation found, in deterministic order
        violations: Vec<String>,
    },
}

impl Error {
    /// Create a syntax error for the given input
    pub fn syntax(input: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Syntax {
            input: input.into(),
            message: msg.into(),
        }
    }

    /// Create an ambiguity error for the given binding
    pub fn ambiguity(binding: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Ambiguity {
            binding: binding.into(),
            message: msg.into(),
        }
    }

    /// Create an invariant-violation error from collected violations
    pub fn invariant(violations: Vec<String>) -> Self {
        Self::Invariant { violations }
    }

    /// Check if this error is a syntax error
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }

    /// Check if this error is an ambiguity error
    pub fn is_ambiguity(&self) -> bool {
        matches!(self, Error::Ambiguity { .. })
    }

    /// Get the collected invariant violations, if any
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            Error::Invariant { violations } => Some(violations),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: parse errors surface the offending input verbatim
    ///
    /// When an operator mistypes a port binding on the command line, the
    /// error must carry the exact string so they can see what was wrong.
    #[test]
    fn story_syntax_errors_carry_the_input() {
        let err = Error::syntax("80:svc:what:else:more", "too many colon separated segments");
        assert!(err.to_string().contains("80:svc:what:else:more"));
        assert!(err.to_string().contains("too many colon"));
        assert!(err.is_syntax());
        assert!(!err.is_ambiguity());
    }

    /// Story: ambiguous bindings are rejected, never silently resolved
    #[test]
    fn story_ambiguity_errors_name_both_resolutions() {
        let err = Error::ambiguity("80/tcp", "matches two services [api, web]");
        assert!(err.to_string().contains("80/tcp"));
        assert!(err.to_string().contains("api"));
        assert!(err.to_string().contains("web"));
        assert!(err.is_ambiguity());
    }

    /// Story: invariant violations are reported together, not fail-fast
    ///
    /// A user fixing a broken app spec should see every structural problem
    /// in one pass rather than replaying resolution once per mistake.
    #[test]
    fn story_invariant_violations_are_collected() {
        let err = Error::invariant(vec![
            "service api is addressing both containers and child apps, can only address one type"
                .to_string(),
            "ports 80/tcp and 81/tcp on service web do not share the same set of targets"
                .to_string(),
        ]);
        let display = err.to_string();
        assert!(display.contains("service api"));
        assert!(display.contains("service web"));
        assert_eq!(err.violations().unwrap().len(), 2);
    }
}
