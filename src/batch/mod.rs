//! Batch validation grouped by domain.
//!
//! Addresses sharing a domain share one MX lookup, at most one SMTP session
//! and at most one catch-all probe. Domain groups are spread over a bounded
//! pool of scoped threads.

mod backend;

pub use backend::{LiveBackend, ProbeBackend};

use std::collections::{HashMap, HashSet};
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::config::ValidatorConfig;
use crate::deadline::Deadline;
use crate::mx::MxHost;
use crate::report::{DomainFacts, ReportBuilder, ValidationOutcome};
use crate::reputation::ReputationLists;
use crate::smtp::{ProbeVerdict, RecipientProbe, SessionError, detect_catch_all};
use crate::validator::{check_format, domain_of};

/// Addresses of one domain, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DomainGroup {
    domain: String,
    addresses: Vec<String>,
}

pub struct DomainBatchOrchestrator<'a> {
    config: &'a ValidatorConfig,
    lists: &'a ReputationLists,
    backend: &'a dyn ProbeBackend,
}

impl<'a> DomainBatchOrchestrator<'a> {
    pub fn new(config: &'a ValidatorConfig, lists: &'a ReputationLists, backend: &'a dyn ProbeBackend) -> Self {
        Self {
            config,
            lists,
            backend,
        }
    }

    /// Validates every distinct address once. The map is keyed by the address
    /// exactly as given; duplicates collapse onto one entry.
    pub fn run<I, S>(&self, addresses: I) -> HashMap<String, ValidationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deadline = Deadline::after(self.config.overall_timeout());
        let builder = ReportBuilder::new(self.config, self.lists);
        let mut results = HashMap::new();

        let unique = dedup(addresses);
        let mut groups: Vec<DomainGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for address in unique {
            let domain = check_format(&address, self.config.format_mode)
                .ok
                .then(|| domain_of(&address))
                .flatten();
            let Some(domain) = domain else {
                let outcome = builder.build(&address, None, &DomainFacts::new(Vec::new()));
                results.insert(address, outcome);
                continue;
            };
            let slot = *index.entry(domain.clone()).or_insert_with(|| {
                groups.push(DomainGroup {
                    domain,
                    addresses: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].addresses.push(address);
        }

        tracing::info!(
            addresses = results.len() + groups.iter().map(|g| g.addresses.len()).sum::<usize>(),
            domains = groups.len(),
            workers = self.config.max_workers.min(groups.len()),
            "batch started"
        );

        for (address, outcome) in self.run_groups(&groups, deadline) {
            results.insert(address, outcome);
        }

        let valid = results.values().filter(|o| o.is_valid).count();
        tracing::info!(total = results.len(), valid, "batch finished");
        results
    }

    fn run_groups(&self, groups: &[DomainGroup], deadline: Deadline) -> Vec<(String, ValidationOutcome)> {
        let workers = self.config.max_workers.max(1).min(groups.len());
        if workers == 0 {
            return Vec::new();
        }

        let next = AtomicUsize::new(0);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(group) = groups.get(i) else { break };
                            done.extend(self.process_group(group, deadline));
                        }
                        done
                    })
                })
                .collect();

            let mut out = Vec::new();
            for handle in handles {
                match handle.join() {
                    Ok(done) => out.extend(done),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            out
        })
    }

    fn process_group(&self, group: &DomainGroup, deadline: Deadline) -> Vec<(String, ValidationOutcome)> {
        let domain = group.domain.as_str();
        let hosts = if self.config.needs_mx() {
            self.backend.resolve_mx(domain)
        } else {
            Vec::new()
        };
        let mut facts = DomainFacts::new(hosts);

        let mut session = SessionGuard(None);
        if self.config.needs_session() {
            let (probe, responsive) = self.open_session(domain, &facts.mx_hosts, deadline);
            session.0 = probe;
            facts.responsive = responsive;
        }

        if self.config.check_catch_all {
            let verdict = match session.probe() {
                Some(probe) if !deadline.expired() => detect_catch_all(probe, domain),
                _ => ProbeVerdict::Indeterminate,
            };
            facts.catch_all = Some(verdict);
        }

        let builder = ReportBuilder::new(self.config, self.lists);
        let mut done = Vec::with_capacity(group.addresses.len());
        for address in &group.addresses {
            if deadline.expired() {
                session.abort();
            }
            let outcome = builder.build(address, session.probe(), &facts);
            done.push((address.clone(), outcome));
        }
        done
    }

    /// Tries each host in preference order until one completes the
    /// handshake. The verdict feeds the responsiveness check.
    fn open_session(
        &self,
        domain: &str,
        hosts: &[MxHost],
        deadline: Deadline,
    ) -> (Option<Box<dyn RecipientProbe>>, ProbeVerdict) {
        if hosts.is_empty() {
            tracing::debug!(domain, "no mail exchanger to probe");
            return (None, ProbeVerdict::Indeterminate);
        }
        for host in hosts {
            if deadline.expired() {
                return (None, ProbeVerdict::Indeterminate);
            }
            match self.backend.connect(host, deadline) {
                Ok(probe) => {
                    tracing::debug!(domain, host = %host.host, "session ready");
                    return (Some(probe), ProbeVerdict::Accepted);
                }
                Err(SessionError::DeadlineExceeded) => {
                    tracing::debug!(domain, host = %host.host, "deadline reached while connecting");
                    return (None, ProbeVerdict::Indeterminate);
                }
                Err(err) => {
                    tracing::warn!(domain, host = %host.host, error = %err, "host unusable, trying next");
                }
            }
        }
        (None, ProbeVerdict::Rejected)
    }
}

/// Owns the session of one domain group and closes it on every exit path.
struct SessionGuard(Option<Box<dyn RecipientProbe>>);

impl SessionGuard {
    fn probe(&mut self) -> Option<&mut dyn RecipientProbe> {
        self.0.as_mut().map(as_probe)
    }

    fn abort(&mut self) {
        if let Some(mut probe) = self.0.take() {
            probe.abort();
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut probe) = self.0.take() {
            probe.close();
        }
    }
}

fn as_probe(probe: &mut Box<dyn RecipientProbe>) -> &mut dyn RecipientProbe {
    probe.as_mut()
}

fn dedup<I, S>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .map(Into::into)
        .filter(|address| seen.insert(address.clone()))
        .collect()
}
