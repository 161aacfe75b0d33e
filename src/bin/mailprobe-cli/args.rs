use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mailprobe_lib::{IndeterminatePolicy, ValidationMode, ValidatorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Ndjson,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Strict,
    Relaxed,
}

#[derive(Parser, Debug)]
#[command(name = "mailprobe-cli", version, about = "Probe email deliverability")]
pub struct Cli {
    /// addresses to check
    pub addresses: Vec<String>,

    /// read addresses from stdin (one per line)
    #[arg(long)]
    pub stdin: bool,

    /// write the report to a file (json/ndjson/csv)
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// print every check, not only the verdict (human format)
    #[arg(long)]
    pub report: bool,

    #[arg(long, value_enum, default_value_t = Mode::Strict)]
    pub mode: Mode,

    #[arg(long)]
    pub no_mx: bool,
    #[arg(long)]
    pub no_banned: bool,
    #[arg(long)]
    pub no_disposable: bool,
    /// flag addresses hosted by free providers
    #[arg(long)]
    pub free: bool,
    /// probe the address with RCPT TO
    #[arg(long)]
    pub existence: bool,
    #[arg(long)]
    pub responsive: bool,
    #[arg(long)]
    pub greylisting: bool,
    #[arg(long)]
    pub catch_all: bool,
    /// enable every check
    #[arg(long)]
    pub all_checks: bool,

    #[arg(long, default_value_t = 10, value_name = "SECS")]
    pub connect_timeout: u64,
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    pub response_timeout: u64,
    /// budget for the whole run, 0 for none
    #[arg(long, value_name = "SECS")]
    pub overall_timeout: Option<u64>,
    #[arg(long, default_value_t = 4)]
    pub workers: usize,
    #[arg(long, default_value = "localhost")]
    pub helo: String,
    /// envelope sender (default: verifier@<helo>)
    #[arg(long)]
    pub mail_from: Option<String>,
    #[arg(long, default_value_t = 25)]
    pub port: u16,
    /// use the domain itself when it has no MX record
    #[arg(long)]
    pub mx_fallback: bool,
    /// count unverifiable SMTP checks as failures
    #[arg(long)]
    pub strict_indeterminate: bool,

    /// extra banned domains, one per line
    #[arg(long, value_name = "FILE")]
    pub banned_list: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub disposable_list: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    pub free_list: Option<PathBuf>,
    /// start from empty lists instead of the built-in ones
    #[arg(long)]
    pub no_builtin_lists: bool,

    /// debug logs (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn config(&self) -> ValidatorConfig {
        let all = self.all_checks;
        ValidatorConfig {
            check_mx_records: all || !self.no_mx,
            check_banned_listed_email: all || !self.no_banned,
            check_disposable_email: all || !self.no_disposable,
            check_free_email: all || self.free,
            check_email_existence: all || self.existence,
            check_mail_server_responsive: all || self.responsive,
            check_greylisting: all || self.greylisting,
            check_catch_all: all || self.catch_all,
            connect_timeout_seconds: self.connect_timeout,
            response_timeout_seconds: self.response_timeout,
            overall_timeout_seconds: self.overall_timeout,
            max_workers: self.workers,
            helo_name: self.helo.clone(),
            mail_from: self.mail_from.clone(),
            port: self.port,
            mx_fallback_to_domain: self.mx_fallback,
            indeterminate_policy: if self.strict_indeterminate {
                IndeterminatePolicy::Fail
            } else {
                IndeterminatePolicy::Pass
            },
            format_mode: match self.mode {
                Mode::Strict => ValidationMode::Strict,
                Mode::Relaxed => ValidationMode::Relaxed,
            },
        }
    }
}
