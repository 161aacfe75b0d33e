use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

pub const VALID_MESSAGE: &str = "The email is valid.";

/// The checks of a report, in their fixed evaluation order.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckKind {
    Format,
    MxRecords,
    BannedList,
    Disposable,
    FreeProvider,
    EmailExistence,
    MailServerResponsive,
    Greylisting,
    CatchAll,
}

impl CheckKind {
    pub const ALL: [CheckKind; 9] = [
        Self::Format,
        Self::MxRecords,
        Self::BannedList,
        Self::Disposable,
        Self::FreeProvider,
        Self::EmailExistence,
        Self::MailServerResponsive,
        Self::Greylisting,
        Self::CatchAll,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::MxRecords => "mxRecords",
            Self::BannedList => "bannedList",
            Self::Disposable => "disposable",
            Self::FreeProvider => "freeProvider",
            Self::EmailExistence => "emailExistence",
            Self::MailServerResponsive => "mailServerResponsive",
            Self::Greylisting => "greylisting",
            Self::CatchAll => "catchAll",
        }
    }

    /// Message reported when this is the first failing check.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Format => "Invalid email format.",
            Self::MxRecords => "MX records do not exist for this email domain.",
            Self::BannedList => "The email domain is on the banned list.",
            Self::Disposable => "Disposable email detected.",
            Self::FreeProvider => "Email belongs to a free email provider.",
            Self::EmailExistence => "Email address does not exist.",
            Self::MailServerResponsive => "Mail server is not responsive.",
            Self::Greylisting => "Email server is using greylisting.",
            Self::CatchAll => "Catch-all domain detected.",
        }
    }

    pub(crate) fn success_message(&self) -> &'static str {
        match self {
            Self::Format => "Valid email format.",
            Self::MxRecords => "MX records exist.",
            Self::BannedList => "The email domain is not on the banned list.",
            Self::Disposable => "Email is not disposable.",
            Self::FreeProvider => "Email does not belong to a free email provider.",
            Self::EmailExistence => "Email address exists.",
            Self::MailServerResponsive => "Mail server is responsive.",
            Self::Greylisting => "No greylisting detected.",
            Self::CatchAll => "Domain is not catch-all.",
        }
    }

    pub(crate) fn indeterminate_message(&self) -> &'static str {
        match self {
            Self::EmailExistence => "Could not verify email existence.",
            Self::MailServerResponsive => "Could not verify mail server responsiveness.",
            Self::Greylisting => "Could not check for greylisting.",
            Self::CatchAll => "Could not determine catch-all status.",
            other => other.success_message(),
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: bool,
    pub message: String,
}

impl CheckOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }

    pub fn disabled(kind: CheckKind) -> Self {
        Self::pass(format!("{} check disabled.", kind.name()))
    }
}

/// Check name to outcome, iterated in declared check order.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    entries: BTreeMap<CheckKind, CheckOutcome>,
}

impl ValidationReport {
    pub fn get(&self, kind: CheckKind) -> Option<&CheckOutcome> {
        self.entries.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CheckKind, &CheckOutcome)> {
        self.entries.iter().map(|(kind, outcome)| (*kind, outcome))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_failure(&self) -> Option<CheckKind> {
        self.iter()
            .find(|(_, outcome)| !outcome.status)
            .map(|(kind, _)| kind)
    }

    pub(crate) fn insert(&mut self, kind: CheckKind, outcome: CheckOutcome) {
        tracing::trace!(check = kind.name(), status = outcome.status, message = %outcome.message, "check evaluated");
        self.entries.insert(kind, outcome);
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub message: String,
    pub report: ValidationReport,
}

impl ValidationOutcome {
    /// Valid iff every recorded status is true; the message belongs to the
    /// first failing check.
    pub fn from_report(report: ValidationReport) -> Self {
        let (is_valid, message) = match report.first_failure() {
            Some(kind) => (false, kind.failure_message()),
            None => (true, VALID_MESSAGE),
        };
        Self {
            is_valid,
            message: message.to_string(),
            report,
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_valid { "VALID" } else { "INVALID" };
        write!(f, "{tag} :: {}", self.message)
    }
}
