//! Media types and `Accept` header parsing.
//!
//! Matching is done on the lowercase `type/subtype` essence. Parameters are
//! split off and, apart from `q`, ignored. Parsing never fails: a malformed
//! element degrades to quality `1.0` and the rest of the header still counts.

use std::fmt;

/// A lowercase, parameter-free media type such as `application/json`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct MediaType(String);

impl MediaType {
    pub const JSON: &'static str = "application/json";
    pub const YAML: &'static str = "text/yaml";
    pub const X_YAML: &'static str = "application/x-yaml";
    pub const TEXT: &'static str = "text/plain";

    /// Normalizes a header value: parameters dropped, whitespace trimmed,
    /// case folded.
    ///
    /// ```rust
    /// use conneg::MediaType;
    ///
    /// let mt = MediaType::parse(" Application/JSON; charset=utf-8");
    /// assert_eq!(mt.as_str(), "application/json");
    /// ```
    pub fn parse(s: &str) -> Self {
        let essence = s.split(';').next().unwrap_or_default();
        Self(essence.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// `*/*`, the match-anything range.
    pub fn is_wildcard(&self) -> bool { self.0 == "*/*" }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self { Self::parse(s) }
}

impl AsRef<str> for MediaType {
    fn as_ref(&self) -> &str { &self.0 }
}

/// One element of an `Accept` header.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptEntry {
    pub media_type: MediaType,
    /// Client preference in `[0.0, 1.0]`.
    pub quality: f32,
}

impl AcceptEntry {
    /// Parses a single media range. Returns `None` for an empty element.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(';');
        let media_type = MediaType::parse(parts.next()?);
        if media_type.is_empty() {
            return None;
        }
        let quality = parts
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .filter(|q| q.is_finite())
            .map_or(1.0, |q| q.clamp(0.0, 1.0));
        Some(Self { media_type, quality })
    }
}

/// Splits an `Accept` header into entries ordered by descending quality.
///
/// The sort is stable: entries with equal weight keep header order.
///
/// ```rust
/// use conneg::media::parse_accept;
///
/// let ranked = parse_accept("text/html; q=0.8, text/yaml, application/json");
/// assert_eq!(ranked[0].media_type.as_str(), "text/yaml");
/// assert_eq!(ranked[2].media_type.as_str(), "text/html");
/// ```
pub fn parse_accept(header: &str) -> Vec<AcceptEntry> {
    let mut entries: Vec<AcceptEntry> = header.split(',').filter_map(AcceptEntry::parse).collect();
    entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    entries
}

/// True for an empty header or one that only says `*/*`.
pub fn is_wildcard_only(header: &str) -> bool {
    let mut entries = header.split(',').filter_map(AcceptEntry::parse);
    match (entries.next(), entries.next()) {
        (None, _) => true,
        (Some(only), None) => only.media_type.is_wildcard(),
        _ => false,
    }
}
