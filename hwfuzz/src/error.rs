use thiserror::Error;

/// Errors that abort a campaign.
///
/// Invariant violations found in a trace are not errors: they are reported
/// as [`Verdict::Fail`](crate::validator::Verdict::Fail) so the driver can
/// preserve artifacts and halt cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// An external tool (DUT or checker) could not be launched.
    #[error("Problem invoking '{program}': {reason}")]
    ToolInvocation { program: String, reason: String },
    /// A trace line does not follow the component's protocol.
    #[error("Protocol error on line {line}: {reason}")]
    Protocol { line: usize, reason: String },
    /// The device printed nothing for a script that must produce events.
    #[error("Device produced no trace events in '{path}'")]
    EmptyTrace { path: String },
    /// An I/O error occurred while handling artifacts.
    #[error("I/O error: {0}")]
    Io(String),
}

/// A type alias for `Result<T, HarnessError>`.
pub type HarnessResult<T> = Result<T, HarnessError>;

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err.to_string())
    }
}

impl HarnessError {
    /// Build a protocol error for the given 1-based trace line.
    pub fn protocol(line: usize, reason: impl Into<String>) -> Self {
        HarnessError::Protocol {
            line,
            reason: reason.into(),
        }
    }
}
