use super::{LookupMx, MxHost, MxResolver, resolver};
use trust_dns_resolver::error::ResolveError;

type LookupResult = Result<Vec<MxHost>, ResolveError>;
type LookupFn = dyn Fn(&str) -> LookupResult;

pub(crate) struct StubResolver {
    pub on_lookup: Box<LookupFn>,
}

impl StubResolver {
    fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> LookupResult + 'static,
    {
        Self {
            on_lookup: Box::new(f),
        }
    }
}

impl LookupMx for StubResolver {
    fn lookup_mx(&self, domain: &str) -> LookupResult {
        (self.on_lookup)(domain)
    }
}

#[test]
fn resolve_sorts_by_priority_keeping_discovery_order_on_ties() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![
            MxHost::new(20, "mx3.example.com"),
            MxHost::new(10, "mx1.example.com"),
            MxHost::new(10, "mx2.example.com"),
            MxHost::new(10, "mx1.example.com"),
        ])
    });

    let hosts = MxResolver::with_resolver(stub, false).resolve("Example.com.");
    let names: Vec<&str> = hosts.iter().map(|mx| mx.host.as_str()).collect();
    assert_eq!(names, ["mx1.example.com", "mx2.example.com", "mx3.example.com"]);
    assert_eq!(hosts[2].priority, 20);
}

#[test]
fn resolve_returns_empty_when_no_records() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    assert!(MxResolver::with_resolver(stub, false).resolve("example.com").is_empty());
}

#[test]
fn resolve_swallows_lookup_errors() {
    let stub = StubResolver::new(|_| Err(ResolveError::from("upstream timeout")));
    assert!(MxResolver::with_resolver(stub, false).resolve("example.com").is_empty());
}

#[test]
fn fallback_uses_domain_as_implicit_host() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    let hosts = MxResolver::with_resolver(stub, true).resolve("example.com");
    assert_eq!(hosts, vec![MxHost::new(0, "example.com")]);
}

#[test]
fn fallback_not_used_when_records_exist() {
    let stub = StubResolver::new(|_| Ok(vec![MxHost::new(5, "mx.example.com")]));
    let hosts = MxResolver::with_resolver(stub, true).resolve("example.com");
    assert_eq!(hosts, vec![MxHost::new(5, "mx.example.com")]);
}

#[test]
fn empty_domain_skips_lookup() {
    let stub = StubResolver::new(|_| panic!("lookup must not run"));
    assert!(MxResolver::with_resolver(stub, true).resolve("  ").is_empty());
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    assert_eq!(resolver::normalize_exchange("Mail.EXAMPLE.com."), "mail.example.com");
}
