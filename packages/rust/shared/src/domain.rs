//! Domain normalization.
//!
//! Raw input lines look like `"  HTTPS://Example.com/about "`; every lookup,
//! fetch and persisted row uses the canonical [`DomainKey`] form
//! `"example.com"` instead.

use serde::{Deserialize, Serialize};

const SCHEMES: [&str; 2] = ["https://", "http://"];

/// A normalized, lowercase host string with no scheme and no path.
///
/// Normalization never fails. Garbage in produces a best-effort (possibly
/// empty) key, and normalizing a key again returns it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainKey(String);

impl DomainKey {
    /// Canonicalize a raw domain string into a lookup key.
    pub fn normalize(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        let mut rest = lowered.trim();

        for scheme in SCHEMES {
            if let Some(stripped) = rest.strip_prefix(scheme) {
                rest = stripped;
                break;
            }
        }

        let host = match rest.find('/') {
            Some(idx) => &rest[..idx],
            None => rest,
        };

        Self(host.trim().to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The text before the first `.` (the whole key if there is none).
    pub fn first_label(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// The first label with a leading `www.` removed.
    pub fn base_label(&self) -> &str {
        let host = self.0.strip_prefix("www.").unwrap_or(&self.0);
        host.split('.').next().unwrap_or_default()
    }

    /// Company name used when nothing better can be extracted.
    pub fn fallback_name(&self) -> String {
        title_case(self.first_label())
    }
}

impl std::fmt::Display for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
///
/// `"my-site"` becomes `"My-Site"`, `"3com"` becomes `"3Com"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
