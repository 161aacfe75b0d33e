//! Per-address report assembly.
//!
//! [`ReportBuilder::build`] runs every check in [`CheckKind::ALL`] order and
//! folds the outcomes into a [`ValidationOutcome`].

mod types;

pub use types::{CheckKind, CheckOutcome, VALID_MESSAGE, ValidationOutcome, ValidationReport};

use crate::config::{IndeterminatePolicy, ValidatorConfig};
use crate::mx::MxHost;
use crate::reputation::{ListKind, ReputationLists};
use crate::smtp::{ProbeVerdict, RcptOutcome, RecipientProbe, probe_existence};
use crate::validator::{canonical_address, check_format, domain_of};

/// What the orchestrator learned about a domain before probing addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainFacts {
    pub mx_hosts: Vec<MxHost>,
    /// Accepted when a session completed its handshake, Rejected when every
    /// host failed, Indeterminate when nothing was attempted.
    pub responsive: ProbeVerdict,
    /// Cached catch-all verdict, computed at most once per domain.
    pub catch_all: Option<ProbeVerdict>,
}

impl DomainFacts {
    pub fn new(mx_hosts: Vec<MxHost>) -> Self {
        Self {
            mx_hosts,
            responsive: ProbeVerdict::Indeterminate,
            catch_all: None,
        }
    }
}

pub struct ReportBuilder<'a> {
    config: &'a ValidatorConfig,
    lists: &'a ReputationLists,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(config: &'a ValidatorConfig, lists: &'a ReputationLists) -> Self {
        Self { config, lists }
    }

    /// Builds the outcome for one address. A failing format check returns
    /// immediately with only the `format` entry. `session` is used for the
    /// recipient probe when existence or greylisting is enabled.
    pub fn build(
        &self,
        address: &str,
        session: Option<&mut dyn RecipientProbe>,
        facts: &DomainFacts,
    ) -> ValidationOutcome {
        let mut report = ValidationReport::default();

        let format = check_format(address, self.config.format_mode);
        if !format.ok {
            tracing::debug!(address, reasons = ?format.reasons, "format check failed");
            report.insert(CheckKind::Format, CheckOutcome::fail(CheckKind::Format.failure_message()));
            return ValidationOutcome::from_report(report);
        }
        report.insert(CheckKind::Format, CheckOutcome::pass(CheckKind::Format.success_message()));

        let domain = domain_of(address).unwrap_or_default();
        let recipient = canonical_address(address).unwrap_or_else(|| address.trim().to_string());
        let mut session = session;
        let mut rcpt: Option<RcptOutcome> = None;

        for kind in CheckKind::ALL.into_iter().skip(1) {
            if !self.config.is_enabled(kind) {
                report.insert(kind, CheckOutcome::disabled(kind));
                continue;
            }
            let outcome = match kind {
                CheckKind::Format => continue,
                CheckKind::MxRecords => predicate(kind, !facts.mx_hosts.is_empty()),
                CheckKind::BannedList => self.listed(kind, ListKind::Banned, &domain),
                CheckKind::Disposable => self.listed(kind, ListKind::Disposable, &domain),
                CheckKind::FreeProvider => self.listed(kind, ListKind::Free, &domain),
                CheckKind::EmailExistence => {
                    let probed = *rcpt.get_or_insert_with(|| probe_existence(session.take(), &recipient));
                    self.from_verdict(kind, probed.verdict)
                }
                CheckKind::MailServerResponsive => self.from_verdict(kind, facts.responsive),
                CheckKind::Greylisting => {
                    let probed = *rcpt.get_or_insert_with(|| probe_existence(session.take(), &recipient));
                    self.greylisting(probed)
                }
                CheckKind::CatchAll => {
                    // accepting a random recipient is the failure case
                    let verdict = match facts.catch_all.unwrap_or(ProbeVerdict::Indeterminate) {
                        ProbeVerdict::Accepted => ProbeVerdict::Rejected,
                        ProbeVerdict::Rejected => ProbeVerdict::Accepted,
                        ProbeVerdict::Indeterminate => ProbeVerdict::Indeterminate,
                    };
                    self.from_verdict(kind, verdict)
                }
            };
            report.insert(kind, outcome);
        }

        let outcome = ValidationOutcome::from_report(report);
        tracing::debug!(address, valid = outcome.is_valid, message = %outcome.message, "report built");
        outcome
    }

    fn listed(&self, kind: CheckKind, list: ListKind, domain: &str) -> CheckOutcome {
        predicate(kind, !self.lists.contains(list, domain))
    }

    /// Accepted passes, Rejected fails, Indeterminate follows the policy.
    fn from_verdict(&self, kind: CheckKind, verdict: ProbeVerdict) -> CheckOutcome {
        match verdict {
            ProbeVerdict::Accepted => CheckOutcome::pass(kind.success_message()),
            ProbeVerdict::Rejected => CheckOutcome::fail(kind.failure_message()),
            ProbeVerdict::Indeterminate => self.indeterminate(kind),
        }
    }

    fn greylisting(&self, rcpt: RcptOutcome) -> CheckOutcome {
        let kind = CheckKind::Greylisting;
        if rcpt.is_greylisted() {
            CheckOutcome::fail(kind.failure_message())
        } else if rcpt.code.is_some() {
            CheckOutcome::pass(kind.success_message())
        } else {
            self.indeterminate(kind)
        }
    }

    fn indeterminate(&self, kind: CheckKind) -> CheckOutcome {
        match self.config.indeterminate_policy {
            IndeterminatePolicy::Pass => CheckOutcome::pass(kind.indeterminate_message()),
            IndeterminatePolicy::Fail => CheckOutcome::fail(kind.failure_message()),
        }
    }
}

fn predicate(kind: CheckKind, passed: bool) -> CheckOutcome {
    if passed {
        CheckOutcome::pass(kind.success_message())
    } else {
        CheckOutcome::fail(kind.failure_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe {
        code: Option<u16>,
        calls: usize,
    }

    impl RecipientProbe for FixedProbe {
        fn host(&self) -> &str {
            "mx.test"
        }

        fn rcpt(&mut self, _address: &str) -> RcptOutcome {
            self.calls += 1;
            self.code.map(RcptOutcome::from_code).unwrap_or_else(RcptOutcome::unanswered)
        }

        fn close(&mut self) {}
    }

    fn facts_with_mx() -> DomainFacts {
        DomainFacts::new(vec![MxHost::new(10, "mx.test")])
    }

    #[test]
    fn malformed_address_short_circuits() {
        let config = ValidatorConfig::default();
        let lists = ReputationLists::builtin();
        let outcome = ReportBuilder::new(&config, &lists).build("invalid-email", None, &facts_with_mx());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.message, "Invalid email format.");
        assert_eq!(outcome.report.len(), 1);
        assert_eq!(outcome.report.get(CheckKind::Format).map(|o| o.status), Some(false));
    }

    #[test]
    fn disabled_checks_keep_report_shape() {
        let config = ValidatorConfig::all_disabled();
        let lists = ReputationLists::new();
        let outcome =
            ReportBuilder::new(&config, &lists).build("valid.email@email.com", None, &DomainFacts::new(vec![]));
        assert!(outcome.is_valid);
        assert_eq!(outcome.message, VALID_MESSAGE);
        assert_eq!(outcome.report.len(), CheckKind::ALL.len());
        for (kind, check) in outcome.report.iter().skip(1) {
            assert!(check.status);
            assert_eq!(check.message, format!("{} check disabled.", kind.name()));
        }
    }

    #[test]
    fn first_failing_check_picks_the_message() {
        let config = ValidatorConfig {
            check_free_email: true,
            ..ValidatorConfig::default()
        };
        let lists = ReputationLists::new()
            .with_domains(ListKind::Disposable, ["both.com"])
            .with_domains(ListKind::Free, ["both.com"]);
        let outcome = ReportBuilder::new(&config, &lists).build("user@both.com", None, &facts_with_mx());
        assert_eq!(outcome.message, "Disposable email detected.");
        assert!(!outcome.report.get(CheckKind::FreeProvider).expect("free").status);
    }

    #[test]
    fn missing_mx_fails_mx_check() {
        let config = ValidatorConfig::default();
        let lists = ReputationLists::new();
        let outcome =
            ReportBuilder::new(&config, &lists).build("user@nonexistent-domain.example", None, &DomainFacts::new(vec![]));
        assert_eq!(outcome.message, "MX records do not exist for this email domain.");
    }

    #[test]
    fn indeterminate_existence_passes_under_default_policy() {
        let config = ValidatorConfig {
            check_email_existence: true,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let outcome = ReportBuilder::new(&config, &lists).build("user@example.com", None, &facts_with_mx());
        let check = outcome.report.get(CheckKind::EmailExistence).expect("entry");
        assert!(check.status);
        assert_eq!(check.message, "Could not verify email existence.");
        assert!(outcome.is_valid);
    }

    #[test]
    fn indeterminate_existence_fails_under_strict_policy() {
        let config = ValidatorConfig {
            check_email_existence: true,
            indeterminate_policy: IndeterminatePolicy::Fail,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let outcome = ReportBuilder::new(&config, &lists).build("user@example.com", None, &facts_with_mx());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.message, "Email address does not exist.");
    }

    #[test]
    fn greylisting_and_existence_share_one_rcpt() {
        let config = ValidatorConfig {
            check_email_existence: true,
            check_greylisting: true,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let mut probe = FixedProbe { code: Some(451), calls: 0 };
        let outcome = ReportBuilder::new(&config, &lists).build(
            "user@example.com",
            Some(&mut probe as &mut dyn RecipientProbe),
            &facts_with_mx(),
        );
        assert_eq!(probe.calls, 1);
        assert!(outcome.report.get(CheckKind::EmailExistence).expect("existence").status);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.message, "Email server is using greylisting.");
    }

    #[test]
    fn rejected_recipient_fails_existence() {
        let config = ValidatorConfig {
            check_email_existence: true,
            check_greylisting: true,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let mut probe = FixedProbe { code: Some(550), calls: 0 };
        let outcome = ReportBuilder::new(&config, &lists).build(
            "ghost@example.com",
            Some(&mut probe as &mut dyn RecipientProbe),
            &facts_with_mx(),
        );
        assert_eq!(outcome.message, "Email address does not exist.");
        assert!(outcome.report.get(CheckKind::Greylisting).expect("greylisting").status);
    }

    #[test]
    fn no_rcpt_when_probe_checks_disabled() {
        let config = ValidatorConfig {
            check_catch_all: true,
            check_mail_server_responsive: true,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let mut probe = FixedProbe { code: Some(250), calls: 0 };
        let mut facts = facts_with_mx();
        facts.responsive = ProbeVerdict::Accepted;
        facts.catch_all = Some(ProbeVerdict::Rejected);
        let outcome = ReportBuilder::new(&config, &lists).build(
            "user@example.com",
            Some(&mut probe as &mut dyn RecipientProbe),
            &facts,
        );
        assert_eq!(probe.calls, 0);
        assert!(outcome.is_valid);
    }

    #[test]
    fn catch_all_accepted_fails_report() {
        let config = ValidatorConfig {
            check_catch_all: true,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let mut facts = facts_with_mx();
        facts.catch_all = Some(ProbeVerdict::Accepted);
        let outcome = ReportBuilder::new(&config, &lists).build("user@x.com", None, &facts);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.message, "Catch-all domain detected.");
    }

    #[test]
    fn unresponsive_server_fails_report() {
        let config = ValidatorConfig {
            check_mail_server_responsive: true,
            ..ValidatorConfig::all_disabled()
        };
        let lists = ReputationLists::new();
        let mut facts = facts_with_mx();
        facts.responsive = ProbeVerdict::Rejected;
        let outcome = ReportBuilder::new(&config, &lists).build("user@unresponsive-domain.com", None, &facts);
        assert_eq!(outcome.message, "Mail server is not responsive.");
    }
}
