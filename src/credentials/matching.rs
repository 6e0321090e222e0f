//! Registry address matching
//!
//! Registries are referenced inconsistently across tools: with or without a
//! scheme, an explicit default port, or a trailing API path such as `/v1/`.
//! Stored keys are never normalized, so all tolerance lives here, applied in
//! a fixed order: exact, approximate, then the raw requested string.

use std::collections::HashMap;
use url::Url;

/// Which matching pass resolved an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Parsed forms are identical
    Exact,
    /// Identical after borrowing scheme, port and path from the stored key
    Approximate,
    /// The unparsed requested string is itself a stored key
    Verbatim,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Approximate => "approximate",
            Self::Verbatim => "verbatim",
        }
    }
}

/// A parsed registry address
#[derive(Debug, Clone)]
struct RegistryAddress {
    url: Url,
    /// Whether the raw string carried a path component
    has_path: bool,
    /// Port written in the raw string, default ports included
    explicit_port: Option<u16>,
}

impl RegistryAddress {
    fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let (has_path, has_port) = match raw.split_once("://") {
            Some((_, rest)) => {
                let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
                (
                    rest[end..].starts_with('/'),
                    authority_has_port(&rest[..end]),
                )
            }
            None => (!url.path().is_empty(), false),
        };
        // the parser elides a port equal to the scheme default
        let explicit_port = if has_port {
            url.port_or_known_default()
        } else {
            None
        };
        Some(Self {
            url,
            has_path,
            explicit_port,
        })
    }

    /// Same registry endpoint, comparing effective ports
    fn matches_exactly(&self, stored: &Url) -> bool {
        same_except_port(&self.url, stored)
            && self.url.port_or_known_default() == stored.port_or_known_default()
    }

    /// Fill the parts this address omits from `stored` and compare
    fn approximates(&self, stored: &Url) -> bool {
        if let Some(port) = self.explicit_port {
            if stored.port_or_known_default() != Some(port) {
                return false;
            }
        }

        let mut candidate = self.url.clone();

        if candidate.scheme() != stored.scheme() && candidate.set_scheme(stored.scheme()).is_err()
        {
            return false;
        }

        if !self.has_path {
            candidate.set_path(stored.path());
        }

        // an omitted port takes the stored one, an explicit one was checked above
        same_except_port(&candidate, stored)
    }
}

/// Whether the authority part of a raw address names a port
fn authority_has_port(authority: &str) -> bool {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    match host_port.rsplit_once(']') {
        // bracketed IPv6 literal
        Some((_, after)) => after.starts_with(':'),
        None => host_port.contains(':'),
    }
}

fn same_except_port(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.username() == b.username()
        && a.password() == b.password()
        && a.host() == b.host()
        && a.path() == b.path()
        && a.query() == b.query()
        && a.fragment() == b.fragment()
}

/// Resolve `requested` against the keys of `entries`.
///
/// Returns the stored key that matched and the pass that found it. Keys are
/// visited in sorted order so that ties within a pass resolve the same way on
/// every call.
pub fn resolve<'a, V>(
    entries: &'a HashMap<String, V>,
    requested: &str,
) -> Option<(&'a str, MatchKind)> {
    let Some(wanted) = RegistryAddress::parse(requested) else {
        return entries
            .get_key_value(requested)
            .map(|(key, _)| (key.as_str(), MatchKind::Verbatim));
    };

    let mut stored: Vec<(&'a str, Url)> = entries
        .keys()
        .filter_map(|key| Url::parse(key).ok().map(|url| (key.as_str(), url)))
        .collect();
    stored.sort_by(|a, b| a.0.cmp(b.0));

    if let Some((key, _)) = stored.iter().find(|(_, url)| wanted.matches_exactly(url)) {
        return Some((*key, MatchKind::Exact));
    }

    if let Some((key, _)) = stored.iter().find(|(_, url)| wanted.approximates(url)) {
        return Some((*key, MatchKind::Approximate));
    }

    entries
        .get_key_value(requested)
        .map(|(key, _)| (key.as_str(), MatchKind::Verbatim))
}
