use thiserror::Error;

/// Contract violations detected when a validator is constructed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    #[error("max_workers must be at least 1")]
    ZeroWorkers,
    #[error("port must not be 0")]
    ZeroPort,
    #[error("helo_name must not be empty")]
    EmptyHeloName,
    #[error("mail_from '{0}' is not an address")]
    InvalidMailFrom(String),
}
