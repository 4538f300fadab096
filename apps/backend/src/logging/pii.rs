use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Regex patterns for PII redaction. Every pattern is a vetted literal.
pub struct PiiPatterns;

impl PiiPatterns {
    pub fn email() -> &'static Regex {
        static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}\b").unwrap()
        });
        &EMAIL
    }

    /// Compact JWS: three base64url segments joined by dots.
    pub fn jwt() -> &'static Regex {
        static JWT: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\beyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*").unwrap()
        });
        &JWT
    }

    /// Opaque base64 or hex runs of 16+ characters.
    pub fn opaque_token() -> &'static Regex {
        static OPAQUE: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\b[A-Za-z0-9+/_-]{16,}={0,2}").unwrap()
        });
        &OPAQUE
    }
}

/// Masks emails (first character of the local part survives) and replaces
/// bearer/recovery tokens and other opaque runs with placeholders.
///
/// Emails go first so their local parts are never mistaken for tokens.
pub fn redact(input: &str) -> String {
    let emails = PiiPatterns::email().replace_all(input, |caps: &regex::Captures| {
        let full = &caps[0];
        match full.split_once('@') {
            Some((local, domain)) => match local.chars().next() {
                Some(first) => format!("{first}***@{domain}"),
                None => format!("@{domain}"),
            },
            None => full.to_string(),
        }
    });
    let jwts = PiiPatterns::jwt().replace_all(&emails, "[REDACTED_JWT]");
    PiiPatterns::opaque_token()
        .replace_all(&jwts, "[REDACTED_TOKEN]")
        .into_owned()
}

/// Display wrapper that redacts on format, for use in tracing fields.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}
