use trust_dns_resolver::Resolver;

use crate::deadline::Deadline;
use crate::mx::{LookupMx, MxError, MxHost, MxResolver};
use crate::smtp::{RecipientProbe, SessionError, SmtpSession, SmtpSettings};

/// Network side of a batch: DNS lookups and ready-to-probe SMTP sessions.
///
/// Shared by every worker of a batch.
pub trait ProbeBackend: Send + Sync {
    fn resolve_mx(&self, domain: &str) -> Vec<MxHost>;

    /// Connects to `host` and completes greeting, EHLO/HELO and MAIL FROM.
    fn connect(&self, host: &MxHost, deadline: Deadline) -> Result<Box<dyn RecipientProbe>, SessionError>;
}

/// Real DNS plus plain TCP SMTP sessions.
pub struct LiveBackend<R = Resolver> {
    resolver: MxResolver<R>,
    settings: SmtpSettings,
}

impl LiveBackend<Resolver> {
    pub fn from_system_conf(settings: SmtpSettings, fallback_to_domain: bool) -> Result<Self, MxError> {
        Ok(Self::new(MxResolver::from_system_conf(fallback_to_domain)?, settings))
    }
}

impl<R> LiveBackend<R> {
    pub fn new(resolver: MxResolver<R>, settings: SmtpSettings) -> Self {
        Self { resolver, settings }
    }
}

impl<R: LookupMx + Send + Sync> ProbeBackend for LiveBackend<R> {
    fn resolve_mx(&self, domain: &str) -> Vec<MxHost> {
        self.resolver.resolve(domain)
    }

    fn connect(&self, host: &MxHost, deadline: Deadline) -> Result<Box<dyn RecipientProbe>, SessionError> {
        let mut session = SmtpSession::connect(host, &self.settings, deadline)?;
        session.handshake(&self.settings.helo_name, &self.settings.envelope_sender())?;
        Ok(Box::new(session))
    }
}
