//! `Accept` header negotiation between the web page and the federation
//! document representations of a thread.
//!
//! Each offer is scored by the most specific media range that matches it
//! (exact > `type/*` > `*/*`). The winner has the highest quality, then the
//! highest specificity, then the earliest position in the client's list.
//! Remaining ties go to the server's offer order.

use std::cmp::Reverse;

use axum::http::header::ACCEPT;
use axum::http::HeaderMap;

pub const TEXT_HTML: &str = "text/html";
pub const APP_ACTIVITY_JSON: &str = "application/activity+json";
pub const APP_ACTIVITY_LD_JSON: &str =
    "application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";

/// Representation selected for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiatedFormat {
    WebPage,
    FederationJson,
    FederationJsonLd,
}

impl NegotiatedFormat {
    /// Offers in server preference order.
    pub const OFFERS: [Self; 3] = [Self::WebPage, Self::FederationJson, Self::FederationJsonLd];

    /// Content type sent back when this format is served.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::WebPage => TEXT_HTML,
            Self::FederationJson => APP_ACTIVITY_JSON,
            Self::FederationJsonLd => APP_ACTIVITY_LD_JSON,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebPage => "html",
            Self::FederationJson => "activity_json",
            Self::FederationJsonLd => "activity_ld_json",
        }
    }

    fn essence(self) -> (&'static str, &'static str) {
        match self {
            Self::WebPage => ("text", "html"),
            Self::FederationJson => ("application", "activity+json"),
            Self::FederationJsonLd => ("application", "ld+json"),
        }
    }
}

/// One parsed entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaRange {
    kind: String,
    subtype: String,
    /// Quality in thousandths, 0..=1000.
    quality: u16,
    position: usize,
}

impl MediaRange {
    /// 2 for an exact match, 1 for `type/*`, 0 for `*/*`, `None` otherwise.
    fn specificity_for(&self, (kind, subtype): (&str, &str)) -> Option<u8> {
        match (self.kind.as_str(), self.subtype.as_str()) {
            ("*", "*") => Some(0),
            (k, "*") if k == kind => Some(1),
            (k, s) if k == kind && s == subtype => Some(2),
            _ => None,
        }
    }
}

/// Selects the representation for a request.
#[must_use]
pub fn negotiate(headers: &HeaderMap) -> NegotiatedFormat {
    let accept = headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    negotiate_accept(&accept)
}

/// Selects the representation for a raw `Accept` value.
///
/// An empty header, or one under which no offer is acceptable, selects the
/// web page.
#[must_use]
pub fn negotiate_accept(accept: &str) -> NegotiatedFormat {
    let ranges = parse_accept(accept);
    if ranges.is_empty() {
        return NegotiatedFormat::WebPage;
    }

    let mut best: Option<((u16, u8, Reverse<usize>), NegotiatedFormat)> = None;
    for offer in NegotiatedFormat::OFFERS {
        let Some(score) = score_offer(&ranges, offer) else {
            continue;
        };
        // strictly greater: earlier server offers win ties
        let better = match &best {
            Some((current, _)) => score > *current,
            None => true,
        };
        if better {
            best = Some((score, offer));
        }
    }

    best.map_or(NegotiatedFormat::WebPage, |(_, offer)| offer)
}

fn score_offer(ranges: &[MediaRange], offer: NegotiatedFormat) -> Option<(u16, u8, Reverse<usize>)> {
    let essence = offer.essence();
    let (range, specificity) = ranges
        .iter()
        .filter_map(|r| r.specificity_for(essence).map(|s| (r, s)))
        .max_by_key(|(r, s)| (*s, Reverse(r.position)))?;

    (range.quality > 0).then_some((range.quality, specificity, Reverse(range.position)))
}

fn parse_accept(accept: &str) -> Vec<MediaRange> {
    split_unquoted(accept, ',')
        .into_iter()
        .enumerate()
        .filter_map(|(position, item)| parse_media_range(item, position))
        .collect()
}

fn parse_media_range(item: &str, position: usize) -> Option<MediaRange> {
    let mut parts = split_unquoted(item, ';').into_iter();
    let essence = parts.next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    let (kind, subtype) = (kind.trim(), subtype.trim());
    if kind.is_empty() || subtype.is_empty() || (kind == "*" && subtype != "*") {
        return None;
    }

    let quality = parts
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
        .map_or(1000, |(_, value)| parse_quality(value.trim()));

    Some(MediaRange {
        kind: kind.to_string(),
        subtype: subtype.to_string(),
        quality,
        position,
    })
}

/// Parses a `q` value into thousandths. Malformed values count as 1.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_quality(value: &str) -> u16 {
    match value.parse::<f32>() {
        Ok(q) if (0.0..=1.0).contains(&q) => (q * 1000.0).round() as u16,
        _ => 1000,
    }
}

/// Splits on `sep`, ignoring separators inside double-quoted strings.
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
