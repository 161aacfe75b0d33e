use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, distributions::Alphanumeric};

use super::session::{SmtpSession, Transport};
use super::types::{ProbeVerdict, RcptOutcome};

/// A live session able to answer recipient probes. The orchestrator owns the
/// boxed probe for one domain group and is the only caller of [`close`].
///
/// [`close`]: RecipientProbe::close
pub trait RecipientProbe: Send {
    fn host(&self) -> &str;

    fn rcpt(&mut self, address: &str) -> RcptOutcome;

    fn close(&mut self);

    /// Drops the connection without the QUIT courtesy.
    fn abort(&mut self) {
        self.close();
    }
}

impl<T: Transport + Send> RecipientProbe for SmtpSession<T> {
    fn host(&self) -> &str {
        SmtpSession::host(self)
    }

    fn rcpt(&mut self, address: &str) -> RcptOutcome {
        match self.rcpt_to(address) {
            Ok(reply) => RcptOutcome::from_code(reply.code),
            Err(err) => {
                tracing::warn!(host = %SmtpSession::host(self), error = %err, "RCPT TO failed");
                RcptOutcome::unanswered()
            }
        }
    }

    fn close(&mut self) {
        self.quit();
    }

    fn abort(&mut self) {
        SmtpSession::abort(self);
    }
}

/// Probes `domain` with a recipient that cannot plausibly exist. `Accepted`
/// means the domain is catch-all.
pub fn detect_catch_all(session: &mut dyn RecipientProbe, domain: &str) -> ProbeVerdict {
    let address = format!("{}@{domain}", random_local_part());
    let verdict = session.rcpt(&address).verdict;
    tracing::debug!(domain, host = session.host(), %verdict, "catch-all probe");
    verdict
}

/// Probes the real `address`. Without a session nothing is attempted and the
/// outcome is Indeterminate.
pub fn probe_existence(session: Option<&mut dyn RecipientProbe>, address: &str) -> RcptOutcome {
    match session {
        Some(session) => {
            let outcome = session.rcpt(address);
            tracing::debug!(address, host = session.host(), verdict = %outcome.verdict, "existence probe");
            outcome
        }
        None => RcptOutcome::unanswered(),
    }
}

/// Random alphanumeric token suffixed with the current time in millis.
pub fn random_local_part() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("{}-{millis}", token.to_ascii_lowercase())
}
