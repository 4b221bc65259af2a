//! `Accept` header parsing for picking a response representation.
//!
//! ```
//! use girder_core::content_negotiation::{Accept, MediaType};
//!
//! let accept = Accept::parse("text/plain, application/json;q=0.5");
//! assert!(accept.quality_for(&MediaType::plain_text()) > accept.quality_for(&MediaType::json()));
//! ```

use crate::HttpRequest;
use std::fmt;

/// A media range such as `application/json` or `text/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
        }
    }

    pub fn json() -> Self {
        Self::new("application", "json")
    }

    pub fn problem_json() -> Self {
        Self::new("application", "problem+json")
    }

    pub fn plain_text() -> Self {
        Self::new("text", "plain")
    }

    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse `type/subtype`, ignoring any parameters.
    pub fn parse(s: &str) -> Option<Self> {
        let essence = s.split(';').next()?.trim();
        let (type_, subtype) = essence.split_once('/')?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }
        Some(Self::new(type_, subtype))
    }

    /// Whether either side covers the other, wildcards included.
    pub fn matches(&self, other: &MediaType) -> bool {
        let part = |a: &str, b: &str| a == "*" || b == "*" || a == b;
        part(&self.type_, &other.type_) && part(&self.subtype, &other.subtype)
    }

    /// 2 for `type/subtype`, 1 for `type/*`, 0 for `*/*`.
    fn specificity(&self) -> u8 {
        match (self.type_.as_str(), self.subtype.as_str()) {
            ("*", _) => 0,
            (_, "*") => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}

/// A parsed `Accept` header: media ranges with quality values, most
/// specific first.
#[derive(Debug, Clone)]
pub struct Accept {
    ranges: Vec<(MediaType, f32)>,
}

impl Default for Accept {
    /// A missing header accepts anything.
    fn default() -> Self {
        Self {
            ranges: vec![(MediaType::any(), 1.0)],
        }
    }
}

impl Accept {
    pub fn parse(header: &str) -> Self {
        let mut ranges: Vec<(MediaType, f32)> = header
            .split(',')
            .filter_map(|part| {
                let media_type = MediaType::parse(part)?;
                let quality = part
                    .split(';')
                    .skip(1)
                    .filter_map(|param| param.split_once('='))
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
                    .and_then(|(_, value)| value.trim().parse::<f32>().ok())
                    .unwrap_or(1.0)
                    .clamp(0.0, 1.0);
                Some((media_type, quality))
            })
            .collect();

        // The most specific matching range decides a type's quality.
        ranges.sort_by(|a, b| b.0.specificity().cmp(&a.0.specificity()));
        Self { ranges }
    }

    /// The request's `Accept` header, or accept-anything when absent.
    pub fn from_request(request: &HttpRequest) -> Self {
        match request.header("Accept") {
            Some(header) if !header.trim().is_empty() => Self::parse(header),
            _ => Self::default(),
        }
    }

    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.ranges
            .iter()
            .find(|(range, _)| range.matches(media_type))
            .map(|(_, quality)| *quality)
            .unwrap_or(0.0)
    }

    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.quality_for(media_type) > 0.0
    }

    /// Highest quality among `media_types`.
    pub fn best_quality<'a>(&self, media_types: impl IntoIterator<Item = &'a MediaType>) -> f32 {
        media_types
            .into_iter()
            .map(|media_type| self.quality_for(media_type))
            .fold(0.0, f32::max)
    }
}
