use std::collections::HashSet;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
};

use super::{MxError, MxHost};

/// DNS seam: anything able to answer an MX query.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        Ok(lookup
            .iter()
            .map(|mx| MxHost::new(mx.preference(), normalize_exchange(&mx.exchange().to_utf8())))
            .collect())
    }
}

/// Resolves the mail exchangers of a domain, most preferred first.
///
/// Resolution never fails: a missing MX set or a DNS error both yield an empty
/// list. With `fallback_to_domain` an MX-less domain is answered with the
/// domain itself as a single implicit host.
pub struct MxResolver<R = Resolver> {
    resolver: R,
    fallback_to_domain: bool,
}

impl MxResolver<Resolver> {
    pub fn from_system_conf(fallback_to_domain: bool) -> Result<Self, MxError> {
        let resolver = Resolver::from_system_conf().map_err(MxError::resolver_init)?;
        Ok(Self::with_resolver(resolver, fallback_to_domain))
    }
}

impl<R: LookupMx> MxResolver<R> {
    pub fn with_resolver(resolver: R, fallback_to_domain: bool) -> Self {
        Self {
            resolver,
            fallback_to_domain,
        }
    }

    pub fn resolve(&self, domain: &str) -> Vec<MxHost> {
        let Some(ascii) = normalize_domain(domain) else {
            return Vec::new();
        };

        let mut hosts = match self.resolver.lookup_mx(&ascii) {
            Ok(hosts) => hosts,
            Err(err) if is_no_records(&err) => Vec::new(),
            Err(err) => {
                tracing::warn!(domain = %ascii, error = %err, "MX lookup failed");
                Vec::new()
            }
        };
        hosts.retain(|mx| !mx.host.is_empty());

        let mut hosts = order_hosts(hosts);
        if hosts.is_empty() && self.fallback_to_domain {
            tracing::debug!(domain = %ascii, "no MX records, using implicit host");
            hosts.push(MxHost::new(0, ascii.clone()));
        }
        tracing::debug!(domain = %ascii, count = hosts.len(), "resolved mail exchangers");
        hosts
    }
}

/// Stable ascending sort by priority; later duplicates of a host are dropped.
pub(crate) fn order_hosts(mut hosts: Vec<MxHost>) -> Vec<MxHost> {
    hosts.sort_by_key(|mx| mx.priority);
    let mut seen = HashSet::new();
    hosts.retain(|mx| seen.insert(mx.host.clone()));
    hosts
}

pub(crate) fn normalize_domain(domain: &str) -> Option<String> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    idna::domain_to_ascii(trimmed).ok().filter(|d| !d.is_empty())
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}
