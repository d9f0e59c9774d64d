// src/dedupe.rs
//! URL canonicalization and two-phase deduplication.
//!
//! Keys: lowercase scheme + host, default port dropped, a single trailing slash
//! trimmed from non-root paths, query kept verbatim, fragment and userinfo dropped.

use std::collections::HashSet;

use url::Url;

use crate::candidate::Candidate;

/// Canonical key for a URL. Unparsable input is returned trimmed.
pub fn normalize(url: &str) -> String {
    let raw = url.trim();
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    if parsed.cannot_be_a_base() {
        return raw.to_string();
    }

    // `Url` already lowercases scheme/host and drops default ports.
    let mut out = String::with_capacity(raw.len());
    out.push_str(parsed.scheme());
    out.push_str("://");
    out.push_str(&parsed.host_str().unwrap_or_default().to_ascii_lowercase());
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }

    let path = parsed.path();
    let path = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };
    out.push_str(if path.is_empty() { "/" } else { path });

    if let Some(q) = parsed.query() {
        out.push('?');
        out.push_str(q);
    }
    out
}

/// Dedupe key of a candidate; a validated final URL wins over the submitted one.
pub fn dedupe_key(candidate: &Candidate) -> String {
    normalize(candidate.resource().url_for_weight())
}

/// Drop later duplicates within one list, keeping encounter order.
/// Returns (kept, dropped_count).
pub fn dedupe_within(items: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for it in items {
        if !seen.insert(dedupe_key(&it)) {
            dropped += 1;
            continue;
        }
        keep.push(it);
    }
    (keep, dropped)
}

/// Drop sources whose key already exists among the datasets (datasets win ties).
/// Returns (kept_sources, dropped_count).
pub fn dedupe_across(datasets: &[Candidate], sources: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let dataset_keys: HashSet<String> = datasets.iter().map(dedupe_key).collect();
    let before = sources.len();
    let kept: Vec<Candidate> = sources
        .into_iter()
        .filter(|s| !dataset_keys.contains(&dedupe_key(s)))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}
