use std::time::Duration;

/// Identity and timing used when talking to mail exchangers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub port: u16,
    pub helo_name: String,
    pub mail_from: Option<String>,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            port: 25,
            helo_name: "localhost".to_string(),
            mail_from: None,
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(10),
        }
    }
}

impl SmtpSettings {
    /// Envelope sender for `MAIL FROM`. Defaults to `verifier@<helo name>`.
    pub fn envelope_sender(&self) -> String {
        self.mail_from
            .as_ref()
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("verifier@{}", self.helo_name))
    }
}
