const LOCAL_MAX: usize = 64;

/// Strict rules: ASCII atext, '.' allowed but never leading, trailing or doubled.
pub(crate) fn is_local_strict(s: &str) -> bool {
    if s.is_empty() || s.len() > LOCAL_MAX {
        return false;
    }
    if s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| c.is_ascii_alphanumeric() || is_atext_symbol(c))
}

/// Relaxed rules also accept a simple quoted string.
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    if s.len() >= 2 && s.len() <= LOCAL_MAX && s.starts_with('"') && s.ends_with('"') {
        let inner = &s[1..s.len() - 1];
        !inner.contains('"') && !inner.chars().any(|c| c.is_control())
    } else {
        is_local_strict(s)
    }
}

fn is_atext_symbol(c: char) -> bool {
    matches!(
        c,
        '!' | '#'
            | '$'
            | '%'
            | '&'
            | '\''
            | '*'
            | '+'
            | '-'
            | '/'
            | '='
            | '?'
            | '^'
            | '_'
            | '`'
            | '{'
            | '|'
            | '}'
            | '~'
            | '.'
    )
}
