#![forbid(unsafe_code)]
//! mailprobe_lib: email deliverability probing (format, reputation lists, MX,
//! SMTP `RCPT TO`).
//!
//! [`Validator`] is the entry point. It checks one address or a batch and
//! returns a [`ValidationOutcome`] per address, with a report entry for each
//! of the nine checks.

pub mod batch;
pub mod config;
pub mod deadline;
pub mod mx;
pub mod report;
pub mod reputation;
pub mod smtp;
pub mod validator;

use std::collections::HashMap;

use thiserror::Error;

pub use batch::{DomainBatchOrchestrator, LiveBackend, ProbeBackend};
pub use config::{ConfigError, IndeterminatePolicy, ValidatorConfig};
pub use deadline::Deadline;
pub use mx::{LookupMx, MxError, MxHost, MxResolver};
pub use report::{CheckKind, CheckOutcome, DomainFacts, ReportBuilder, VALID_MESSAGE, ValidationOutcome, ValidationReport};
pub use reputation::{ListKind, ReputationError, ReputationLists};
pub use smtp::{ProbeVerdict, RcptOutcome, RecipientProbe, SessionError, SmtpSession, SmtpSettings};
pub use validator::{FormatReport, ValidationMode, canonical_address, check_format, domain_of};

/// Reasons a [`Validator`] cannot be built.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolver(#[from] MxError),
}

/// Configured validator. Cheap to share across threads; every call builds its
/// own sessions.
pub struct Validator {
    config: ValidatorConfig,
    lists: ReputationLists,
    backend: Box<dyn ProbeBackend>,
}

impl Validator {
    /// Validator backed by the system DNS configuration and plain TCP SMTP.
    pub fn new(config: ValidatorConfig, lists: ReputationLists) -> Result<Self, ValidatorError> {
        config.validate()?;
        let backend = LiveBackend::from_system_conf(config.smtp_settings(), config.mx_fallback_to_domain)?;
        Ok(Self {
            config,
            lists,
            backend: Box::new(backend),
        })
    }

    pub fn with_backend(
        config: ValidatorConfig,
        lists: ReputationLists,
        backend: Box<dyn ProbeBackend>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            lists,
            backend,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn lists(&self) -> &ReputationLists {
        &self.lists
    }

    pub fn validate(&self, address: &str) -> ValidationOutcome {
        let mut results = self.validate_batch([address]);
        match results.remove(address) {
            Some(outcome) => outcome,
            None => ReportBuilder::new(&self.config, &self.lists).build(address, None, &DomainFacts::new(Vec::new())),
        }
    }

    /// One outcome per distinct input address, keyed by the address as given.
    pub fn validate_batch<I, S>(&self, addresses: I) -> HashMap<String, ValidationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainBatchOrchestrator::new(&self.config, &self.lists, self.backend.as_ref()).run(addresses)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("lists", &self.lists)
            .finish_non_exhaustive()
    }
}
