//! Syntactic gate for candidate addresses.
//!
//! [`check_format`] decides whether an address has the `local@domain` shape
//! the rest of the pipeline relies on; [`domain_of`] extracts the grouping key.

mod domain;
mod local;
mod types;

pub use types::{FormatReport, ValidationMode};

use domain::check_domain;
use local::{is_local_relaxed, is_local_strict};

const ADDRESS_MAX: usize = 254;

pub fn check_format(email: &str, mode: ValidationMode) -> FormatReport {
    let input = email.trim();
    let mut reasons = Vec::new();

    if input.len() > ADDRESS_MAX {
        reasons.push(format!("total length {} > {ADDRESS_MAX}", input.len()));
    }

    let Some((local, domain)) = split_address(input) else {
        reasons.push("must contain exactly one '@'".to_string());
        return FormatReport::from_reasons(reasons);
    };

    if local.is_empty() {
        reasons.push("local part is empty".to_string());
    } else {
        let local_ok = match mode {
            ValidationMode::Strict => is_local_strict(local),
            ValidationMode::Relaxed => is_local_relaxed(local),
        };
        if !local_ok {
            reasons.push(match mode {
                ValidationMode::Strict => "invalid local part (strict rules)".into(),
                ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
            });
        }
    }

    check_domain(domain, &mut reasons);

    FormatReport::from_reasons(reasons)
}

/// Domain of `email` (text after the last `@`), lower-cased and IDNA-converted.
/// Returns `None` when there is no `@` or nothing follows it.
pub fn domain_of(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    if domain.is_empty() {
        return None;
    }
    Some(domain::ascii_domain(domain))
}

/// The address as it goes on the wire: surrounding whitespace dropped, local
/// part kept verbatim, domain in lower-case ASCII form.
pub fn canonical_address(email: &str) -> Option<String> {
    let (local, domain) = split_address(email.trim())?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(format!("{local}@{}", domain::ascii_domain(domain)))
}

fn split_address(input: &str) -> Option<(&str, &str)> {
    let (local, domain) = input.rsplit_once('@')?;
    if local.contains('@') && !local.starts_with('"') {
        return None;
    }
    Some((local, domain))
}
