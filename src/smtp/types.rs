use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Tri-state result of any RCPT TO based check.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeVerdict {
    Accepted,
    Rejected,
    /// Temporary failure, unexpected code, timeout or no session at all.
    Indeterminate,
}

impl ProbeVerdict {
    /// Classification table shared by the existence and catch-all probes.
    pub fn from_code(code: u16) -> Self {
        match code {
            250 | 251 => Self::Accepted,
            550 | 553 | 554 => Self::Rejected,
            _ => Self::Indeterminate,
        }
    }

    /// Classifies a raw reply line on its three leading digits alone.
    pub fn classify(raw: &str) -> Self {
        match parse_code(raw) {
            Some(code) => Self::from_code(code),
            None => Self::Indeterminate,
        }
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected => f.write_str("rejected"),
            Self::Indeterminate => f.write_str("indeterminate"),
        }
    }
}

pub(crate) fn parse_code(raw: &str) -> Option<u16> {
    let digits = raw.as_bytes().get(..3)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Verdict of one RCPT TO plus the code it was derived from, if any.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcptOutcome {
    pub verdict: ProbeVerdict,
    pub code: Option<u16>,
}

impl RcptOutcome {
    pub fn from_code(code: u16) -> Self {
        Self {
            verdict: ProbeVerdict::from_code(code),
            code: Some(code),
        }
    }

    /// No reply was obtained (no session, I/O failure, deadline).
    pub fn unanswered() -> Self {
        Self {
            verdict: ProbeVerdict::Indeterminate,
            code: None,
        }
    }

    /// Temporary refusals: 421 and 450/451/452.
    pub fn is_greylisted(&self) -> bool {
        matches!(self.code, Some(421 | 450..=452))
    }
}

/// A complete (possibly multi-line) SMTP reply.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Greeted,
    SenderSet,
    Completed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::Greeted => "greeted",
            Self::SenderSet => "sender-set",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Greeting,
    Ehlo,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classification_table() {
        for code in [250, 251] {
            assert_eq!(ProbeVerdict::from_code(code), ProbeVerdict::Accepted);
        }
        for code in [550, 553, 554] {
            assert_eq!(ProbeVerdict::from_code(code), ProbeVerdict::Rejected);
        }
        for code in [450, 451, 452, 421, 252, 551, 500, 0] {
            assert_eq!(ProbeVerdict::from_code(code), ProbeVerdict::Indeterminate);
        }
    }

    #[test]
    fn classify_unreadable_lines() {
        assert_eq!(ProbeVerdict::classify(""), ProbeVerdict::Indeterminate);
        assert_eq!(ProbeVerdict::classify("25"), ProbeVerdict::Indeterminate);
        assert_eq!(ProbeVerdict::classify("OK 250"), ProbeVerdict::Indeterminate);
        assert_eq!(ProbeVerdict::classify("550 5.1.1 no such user"), ProbeVerdict::Rejected);
    }

    #[test]
    fn greylisting_codes() {
        assert!(RcptOutcome::from_code(450).is_greylisted());
        assert!(RcptOutcome::from_code(452).is_greylisted());
        assert!(RcptOutcome::from_code(421).is_greylisted());
        assert!(!RcptOutcome::from_code(550).is_greylisted());
        assert!(!RcptOutcome::from_code(250).is_greylisted());
        assert!(!RcptOutcome::unanswered().is_greylisted());
    }

    proptest! {
        #[test]
        fn classification_depends_only_on_leading_digits(
            code in 0u16..1000,
            sep in prop::sample::select(vec![" ", "-", ""]),
            tail in "[ -~]{0,40}",
        ) {
            let line = format!("{code:03}{sep}{tail}");
            prop_assert_eq!(ProbeVerdict::classify(&line), ProbeVerdict::from_code(code));
        }
    }
}
