mod error;

pub use error::ConfigError;

use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::report::CheckKind;
use crate::smtp::SmtpSettings;
use crate::validator::ValidationMode;

/// What an Indeterminate SMTP probe counts as.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndeterminatePolicy {
    /// Not proven false: the check passes with a "Could not verify ..." message.
    #[default]
    Pass,
    /// The check fails with its regular failure message.
    Fail,
}

/// Switches and limits for one validator. Immutable once handed over.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase", default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub check_mx_records: bool,
    pub check_banned_listed_email: bool,
    pub check_disposable_email: bool,
    pub check_free_email: bool,
    pub check_email_existence: bool,
    pub check_mail_server_responsive: bool,
    pub check_greylisting: bool,
    pub check_catch_all: bool,
    pub connect_timeout_seconds: u64,
    pub response_timeout_seconds: u64,
    /// Budget for a whole batch; `None` or `0` means unbounded.
    pub overall_timeout_seconds: Option<u64>,
    pub max_workers: usize,
    pub helo_name: String,
    pub mail_from: Option<String>,
    pub port: u16,
    pub mx_fallback_to_domain: bool,
    pub indeterminate_policy: IndeterminatePolicy,
    pub format_mode: ValidationMode,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            check_mx_records: true,
            check_banned_listed_email: true,
            check_disposable_email: true,
            check_free_email: false,
            check_email_existence: false,
            check_mail_server_responsive: false,
            check_greylisting: false,
            check_catch_all: false,
            connect_timeout_seconds: 10,
            response_timeout_seconds: 10,
            overall_timeout_seconds: None,
            max_workers: 4,
            helo_name: "localhost".to_string(),
            mail_from: None,
            port: 25,
            mx_fallback_to_domain: false,
            indeterminate_policy: IndeterminatePolicy::Pass,
            format_mode: ValidationMode::Strict,
        }
    }
}

impl ValidatorConfig {
    /// Only the format gate stays active.
    pub fn all_disabled() -> Self {
        Self {
            check_mx_records: false,
            check_banned_listed_email: false,
            check_disposable_email: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "connect_timeout_seconds",
            });
        }
        if self.response_timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "response_timeout_seconds",
            });
        }
        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.helo_name.trim().is_empty() {
            return Err(ConfigError::EmptyHeloName);
        }
        if let Some(sender) = self.mail_from.as_deref() {
            if !sender.is_empty() && !sender.contains('@') {
                return Err(ConfigError::InvalidMailFrom(sender.to_string()));
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self, kind: CheckKind) -> bool {
        match kind {
            CheckKind::Format => true,
            CheckKind::MxRecords => self.check_mx_records,
            CheckKind::BannedList => self.check_banned_listed_email,
            CheckKind::Disposable => self.check_disposable_email,
            CheckKind::FreeProvider => self.check_free_email,
            CheckKind::EmailExistence => self.check_email_existence,
            CheckKind::MailServerResponsive => self.check_mail_server_responsive,
            CheckKind::Greylisting => self.check_greylisting,
            CheckKind::CatchAll => self.check_catch_all,
        }
    }

    /// Whether any check needs a live SMTP session.
    pub fn needs_session(&self) -> bool {
        self.check_email_existence
            || self.check_mail_server_responsive
            || self.check_greylisting
            || self.check_catch_all
    }

    /// Whether the real address has to be proposed with `RCPT TO`.
    pub fn needs_recipient_probe(&self) -> bool {
        self.check_email_existence || self.check_greylisting
    }

    pub fn needs_mx(&self) -> bool {
        self.check_mx_records || self.needs_session()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_seconds)
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            port: self.port,
            helo_name: self.helo_name.clone(),
            mail_from: self.mail_from.clone(),
            connect_timeout: self.connect_timeout(),
            response_timeout: self.response_timeout(),
        }
    }
}
