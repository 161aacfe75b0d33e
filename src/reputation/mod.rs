//! Static domain reputation lists (banned, disposable, free providers).
//!
//! Lists are loaded once and never mutated afterwards; the validator only
//! borrows them.

mod error;

pub use error::ReputationError;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Banned,
    Disposable,
    Free,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReputationLists {
    banned: HashSet<String>,
    disposable: HashSet<String>,
    free: HashSet<String>,
}

impl ReputationLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small seed list, enough for demos and smoke tests.
    pub fn builtin() -> Self {
        Self::new()
            .with_domains(ListKind::Banned, ["banned.com", "spamdomain.com"])
            .with_domains(ListKind::Disposable, ["mailinator.com", "10minutemail.com"])
            .with_domains(ListKind::Free, ["gmail.com", "yahoo.com", "hotmail.com"])
    }

    pub fn with_domains<I, S>(mut self, kind: ListKind, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.set_mut(kind);
        for domain in domains {
            if let Some(entry) = normalize_entry(domain.as_ref()) {
                set.insert(entry);
            }
        }
        self
    }

    /// Reads one domain per line; blank lines and `#` comments are skipped.
    pub fn with_reader<R: BufRead>(self, kind: ListKind, reader: R) -> Result<Self, ReputationError> {
        let mut domains = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| ReputationError::Io { source })?;
            domains.push(line);
        }
        Ok(self.with_domains(kind, domains))
    }

    pub fn with_file(self, kind: ListKind, path: impl AsRef<Path>) -> Result<Self, ReputationError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ReputationError::read(path, err))?;
        let lists = self.with_reader(kind, BufReader::new(file))?;
        tracing::debug!(path = %path.display(), ?kind, size = lists.len(kind), "loaded domain list");
        Ok(lists)
    }

    pub fn contains(&self, kind: ListKind, domain: &str) -> bool {
        ascii_key(domain).is_some_and(|key| self.set(kind).contains(&key))
    }

    pub fn len(&self, kind: ListKind) -> usize {
        self.set(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.banned.is_empty() && self.disposable.is_empty() && self.free.is_empty()
    }

    fn set(&self, kind: ListKind) -> &HashSet<String> {
        match kind {
            ListKind::Banned => &self.banned,
            ListKind::Disposable => &self.disposable,
            ListKind::Free => &self.free,
        }
    }

    fn set_mut(&mut self, kind: ListKind) -> &mut HashSet<String> {
        match kind {
            ListKind::Banned => &mut self.banned,
            ListKind::Disposable => &mut self.disposable,
            ListKind::Free => &mut self.free,
        }
    }
}

fn normalize_entry(raw: &str) -> Option<String> {
    ascii_key(raw.split('#').next().unwrap_or_default())
}

/// Lower-case ASCII (punycode) form, the shape `domain_of` produces.
fn ascii_key(domain: &str) -> Option<String> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(idna::domain_to_ascii(trimmed).unwrap_or_else(|_| trimmed.to_ascii_lowercase()))
}
