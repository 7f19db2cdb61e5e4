//! Normalization of user supplied server addresses
//!
//! Addresses typed on a phone keyboard or pasted from elsewhere arrive with
//! schemes, ports, quotes, stray spaces and invisible characters. Rather than
//! reject them, the input is cleaned and expanded into a short, ordered list of
//! hostnames that are tried one after another.

use std::fmt;

/// One normalized hostname to attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateHost(String);

impl CandidateHost {
    /// Get the hostname as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for CandidateHost {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Resolve raw input into candidate hostnames
///
/// Produces, in order and without duplicates: the cleaned input, the cleaned
/// input with spaces removed, and the cleaned input with whitespace runs
/// replaced by `.`. An empty result means the input is unusable.
///
/// # Examples
/// ```
/// use codex_app_client::transport::websocket::resolve_candidates;
///
/// let hosts = resolve_candidates("ws://10.0.0.5:8390/foo");
/// assert_eq!(hosts[0].as_str(), "10.0.0.5");
/// ```
#[must_use]
pub fn resolve_candidates(raw: &str) -> Vec<CandidateHost> {
    let cleaned = clean(&strip_decorations(raw));
    let unspaced = cleaned.replace(' ', "");
    let dotted = cleaned
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    let mut out: Vec<CandidateHost> = Vec::with_capacity(3);
    for variant in [cleaned, unspaced, dotted] {
        if !variant.is_empty() && !out.iter().any(|c| c.0 == variant) {
            out.push(CandidateHost(variant));
        }
    }
    out
}

/// Remove scheme, quotes, path, IPv6 brackets and port
fn strip_decorations(raw: &str) -> String {
    let mut host = raw.trim();

    for scheme in ["ws://", "wss://"] {
        if host.len() >= scheme.len()
            && host.is_char_boundary(scheme.len())
            && host[..scheme.len()].eq_ignore_ascii_case(scheme)
        {
            host = &host[scheme.len()..];
        }
    }

    for quote in ['"', '\''] {
        host = host.strip_prefix(quote).unwrap_or(host);
        host = host.strip_suffix(quote).unwrap_or(host);
    }

    if let Some((before, _)) = host.split_once('/') {
        host = before;
    }

    if host.starts_with('[') && host.contains(']') {
        host = host[1..].split(']').next().unwrap_or_default();
    } else if host.matches(':').count() == 1 && host.contains('.') {
        host = host.rsplit_once(':').map_or(host, |(before, _)| before);
    }

    host.to_string()
}

/// Drop control and zero-width characters, then trim
fn clean(host: &str) -> String {
    host.chars()
        .filter(|c| !is_invisible(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

const fn is_invisible(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}' | '\u{200B}' | '\u{FEFF}')
}
