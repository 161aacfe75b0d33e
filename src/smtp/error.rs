use thiserror::Error;

use super::types::{AttemptStage, SessionState};

/// Failure of one session against one host. Never surfaced to callers of the
/// validator: the orchestrator moves to the next host or reports Indeterminate.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error with {host}: {source}")]
    Io {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{host} timed out during {stage}")]
    Timeout { host: String, stage: AttemptStage },
    #[error("{host} closed the connection during {stage}")]
    Closed { host: String, stage: AttemptStage },
    #[error("malformed reply from {host}: {detail}")]
    Protocol { host: String, detail: String },
    #[error("{stage} refused by {host} with {code}")]
    Refused {
        host: String,
        stage: AttemptStage,
        code: u16,
    },
    #[error("{stage} not allowed in state {state}")]
    InvalidState {
        stage: AttemptStage,
        state: SessionState,
    },
    #[error("overall deadline exceeded")]
    DeadlineExceeded,
}

impl SessionError {
    pub(crate) fn io(host: &str, stage: AttemptStage, source: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match source.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Self::Timeout {
                host: host.to_string(),
                stage,
            },
            ErrorKind::UnexpectedEof => Self::Closed {
                host: host.to_string(),
                stage,
            },
            _ => Self::Io {
                host: host.to_string(),
                source,
            },
        }
    }

    pub(crate) fn protocol(host: &str, detail: impl Into<String>) -> Self {
        Self::Protocol {
            host: host.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether the underlying socket can still carry a QUIT.
    pub(crate) fn leaves_connection_usable(&self) -> bool {
        matches!(
            self,
            Self::Refused { .. } | Self::InvalidState { .. } | Self::Protocol { .. }
        )
    }
}
