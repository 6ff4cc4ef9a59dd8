//! Core data models for the shard mirror resolver

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level domains the sharded hosts are served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopLevelDomain {
    Org,
    Net,
    To,
}

impl TopLevelDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopLevelDomain::Org => "org",
            TopLevelDomain::Net => "net",
            TopLevelDomain::To => "to",
        }
    }
}

impl fmt::Display for TopLevelDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopLevelDomain {
    type Err = ();

    /// Case-insensitive match against the supported TLDs
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("org") {
            Ok(TopLevelDomain::Org)
        } else if s.eq_ignore_ascii_case("net") {
            Ok(TopLevelDomain::Net)
        } else if s.eq_ignore_ascii_case("to") {
            Ok(TopLevelDomain::To)
        } else {
            Err(())
        }
    }
}

/// Structured fields of a sharded image URL such as `https://k02.mbdny.org/a.jpg`
///
/// Only produced by [`crate::url_parser::parse_reference`]; prefix, root domain and
/// TLD are lowercase, the path is kept verbatim (query and fragment included).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedReference {
    /// Letters before the shard number (`k` in `k02`)
    pub prefix: String,
    /// Numeric shard id (`2` in `k02`)
    pub shard_number: u16,
    /// Registrable label without TLD (`mbdny`)
    pub root_domain: String,
    pub top_level_domain: TopLevelDomain,
    /// Everything after the host, empty or starting with `/`
    pub path: String,
}

impl ParsedReference {
    /// Scheme and host with the shard zero-padded to two digits, e.g. `https://k02.mbdny.org`
    pub fn base(&self) -> String {
        shard_base(
            &self.prefix,
            self.shard_number,
            &self.root_domain,
            self.top_level_domain,
        )
    }

    /// Canonical `https` URL rebuilt from the parsed fields
    pub fn to_url(&self) -> String {
        format!("{}{}", self.base(), self.path)
    }
}

/// Build `https://<prefix><shard:02>.<root>.<tld>`
pub fn shard_base(prefix: &str, shard_number: u16, root_domain: &str, tld: TopLevelDomain) -> String {
    format!("https://{}{:02}.{}.{}", prefix, shard_number, root_domain, tld)
}

/// A configured fallback root such as `mbrtz.org`, split into label and TLD
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FallbackRoot {
    pub label: String,
    pub top_level_domain: TopLevelDomain,
}

impl FallbackRoot {
    /// Parse a `label.tld` entry. Anything with more or fewer than two parts is rejected.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split('.');
        let label = parts.next()?;
        let tld = parts.next()?;
        if parts.next().is_some() || !crate::url_parser::is_root_label(label) {
            return None;
        }
        Some(FallbackRoot {
            label: label.to_ascii_lowercase(),
            top_level_domain: tld.parse().ok()?,
        })
    }
}

/// Ordered, deduplicated list of mirror URLs to probe, highest priority first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateList {
    urls: Vec<String>,
}

impl CandidateList {
    pub(crate) fn new(urls: Vec<String>) -> Self {
        CandidateList { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.urls.iter()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }
}

impl IntoIterator for CandidateList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.urls.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.urls.iter()
    }
}

/// Progress of one resolution attempt
///
/// Moves `Untried -> Probing -> Resolved | Exhausted`; the last two are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Untried,
    /// Probing the candidate at this index
    Probing(usize),
    Resolved(String),
    Exhausted,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionState::Resolved(_) | ResolutionState::Exhausted)
    }

    /// The working URL, if this state is `Resolved`
    pub fn resolved_url(&self) -> Option<&str> {
        match self {
            ResolutionState::Resolved(url) => Some(url),
            _ => None,
        }
    }

    /// Move to `next` if the transition is allowed.
    ///
    /// Returns `false` and leaves the state untouched otherwise. Terminal states
    /// never change and probing only moves forward through the candidate list.
    pub fn advance(&mut self, next: ResolutionState) -> bool {
        let allowed = match (&*self, &next) {
            (ResolutionState::Untried, ResolutionState::Probing(_)) => true,
            (ResolutionState::Untried, ResolutionState::Exhausted) => true,
            (ResolutionState::Probing(current), ResolutionState::Probing(index)) => index > current,
            (ResolutionState::Probing(_), ResolutionState::Resolved(_)) => true,
            (ResolutionState::Probing(_), ResolutionState::Exhausted) => true,
            _ => false,
        };
        if allowed {
            *self = next;
        }
        allowed
    }
}
