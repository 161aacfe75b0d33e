//! Client side of the SMTP dialogue used for recipient probing.
//!
//! [`SmtpSession`] drives a single connection through greeting, EHLO/HELO and
//! MAIL FROM, then answers any number of `RCPT TO` probes until it is closed.
//! [`detect_catch_all`] and [`probe_existence`] turn replies into
//! [`ProbeVerdict`]s.

mod error;
#[cfg(test)]
pub(crate) mod mock;
mod options;
mod probe;
mod session;
mod types;

pub use error::SessionError;
pub use options::SmtpSettings;
pub use probe::{RecipientProbe, detect_catch_all, probe_existence, random_local_part};
pub use session::{SmtpSession, Transport};
pub use types::{AttemptStage, ProbeVerdict, RcptOutcome, SessionState, SmtpReply};
