// src/theme.rs
//! Theme relevance: a topic signature (unigrams + adjacent bigrams) and an overlap
//! score for candidates.
//!
//! A candidate is *off-theme* when it shares no bigram with the signature and fewer
//! than `min_hits` unigrams. Off-theme items get a soft multiplicative demotion; in
//! strict mode generated items are dropped instead. Connector items are never
//! judged here.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::candidate::{FoundBy, Resource};

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\w+").unwrap());

/// Minimum token length (in chars) kept by the tokenizer.
const MIN_TOKEN_CHARS: usize = 3;

/// Lowercase, split on non-word characters, keep tokens of 3+ chars.
pub fn tokenize(input: &str) -> Vec<String> {
    let lowered = input.to_lowercase();
    RE_WORD
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

pub fn bigrams(tokens: &[String]) -> HashSet<(String, String)> {
    tokens
        .windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect()
}

/// URL path as words: separators `-`, `_`, `.` become spaces.
pub fn url_path_tokens(url: &str) -> Vec<String> {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return Vec::new();
    };
    let path = parsed.path().replace(['-', '_', '.', '/'], " ");
    tokenize(&path)
}

/// Unigram and bigram sets describing one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeSignature {
    pub unigrams: HashSet<String>,
    pub bigrams: HashSet<(String, String)>,
}

impl ThemeSignature {
    /// Keywords are appended to title + rationale before tokenizing.
    pub fn build<S: AsRef<str>>(title: &str, rationale: &str, keywords: &[S]) -> Self {
        let mut text = format!("{title} {rationale}");
        for k in keywords {
            text.push(' ');
            text.push_str(k.as_ref());
        }
        let toks = tokenize(&text);
        Self {
            bigrams: bigrams(&toks),
            unigrams: toks.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unigrams.is_empty()
    }
}

/// How off-theme items are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    /// Keep and demote.
    Soft,
    /// Drop generated items, keep connector items.
    Strict,
}

impl ThemeMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ThemeMode::Strict
        } else {
            ThemeMode::Soft
        }
    }

    /// Whether an item survives the theme filter.
    pub fn keeps(&self, found_by: FoundBy, off_theme: bool) -> bool {
        match (*self, found_by) {
            (_, FoundBy::Connector) => true,
            (ThemeMode::Soft, _) => true,
            (ThemeMode::Strict, FoundBy::Generated) => !off_theme,
        }
    }
}

/// Score of one candidate against a signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeScore {
    pub weight: f32,
    pub off_theme: bool,
    pub unigram_hits: usize,
    pub bigram_match: bool,
}

impl ThemeScore {
    pub fn neutral() -> Self {
        Self {
            weight: 1.0,
            off_theme: false,
            unigram_hits: 0,
            bigram_match: false,
        }
    }
}

fn candidate_tokens(res: &Resource) -> Vec<String> {
    let text = format!(
        "{} {} {} {}",
        res.title,
        res.description_or_empty(),
        res.provenance_name,
        res.organization.as_deref().unwrap_or_default()
    );
    let mut toks = tokenize(&text);
    toks.extend(url_path_tokens(res.url_for_weight()));
    toks
}

/// Overlap score. An empty signature has no opinion and scores neutral.
pub fn score(res: &Resource, sig: &ThemeSignature, min_hits: usize, penalty: f32) -> ThemeScore {
    if sig.is_empty() {
        return ThemeScore::neutral();
    }

    let toks = candidate_tokens(res);
    let bigram_match = bigrams(&toks).iter().any(|b| sig.bigrams.contains(b));
    let unigram_hits = toks
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|t| sig.unigrams.contains(*t))
        .count();
    let off_theme = !bigram_match && unigram_hits < min_hits;
    let weight = if off_theme {
        (1.0 - penalty).max(0.0)
    } else {
        1.0
    };

    ThemeScore {
        weight,
        off_theme,
        unigram_hits,
        bigram_match,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> ThemeSignature {
        ThemeSignature::build(
            "Tiger mosquito spread in France",
            "Where aedes albopictus settled since 2004",
            &["moustique tigre", "surveillance"],
        )
    }

    #[test]
    fn tokenizer_drops_short_tokens() {
        assert_eq!(
            tokenize("The Air-quality of EU is OK, ça va: données"),
            vec!["the", "air", "quality", "données"]
        );
    }

    #[test]
    fn signature_includes_keywords_and_bigrams() {
        let s = sig();
        assert!(s.unigrams.contains("moustique"));
        assert!(s.unigrams.contains("albopictus"));
        assert!(s
            .bigrams
            .contains(&("tiger".to_string(), "mosquito".to_string())));
        // Keywords are appended, so the last rationale token pairs with the first keyword.
        assert!(s
            .bigrams
            .contains(&("2004".to_string(), "moustique".to_string())));
    }

    #[test]
    fn bigram_match_is_on_theme() {
        let r = Resource::new("Tiger mosquito map", "https://example.org/maps/1");
        let sc = score(&r, &sig(), 2, 0.15);
        assert!(sc.bigram_match);
        assert!(!sc.off_theme);
        assert_eq!(sc.weight, 1.0);
    }

    #[test]
    fn unigram_hits_from_url_path() {
        let r = Resource::new("Weekly bulletin", "https://example.org/aedes-albopictus/surveillance");
        let sc = score(&r, &sig(), 2, 0.15);
        assert!(sc.unigram_hits >= 2, "{sc:?}");
        assert!(!sc.off_theme);
    }

    #[test]
    fn off_theme_gets_soft_penalty() {
        let r = Resource::new("Football results", "https://sports.example.org/league/table")
            .with_description("Season standings");
        let sc = score(&r, &sig(), 2, 0.15);
        assert!(sc.off_theme);
        assert!((sc.weight - 0.85).abs() < 1e-6);
    }

    #[test]
    fn penalty_never_goes_negative() {
        let r = Resource::new("Football", "https://sports.example.org/x/y");
        let sc = score(&r, &sig(), 2, 1.7);
        assert_eq!(sc.weight, 0.0);
    }

    #[test]
    fn empty_signature_is_neutral() {
        let r = Resource::new("Anything", "https://example.org/x/y");
        let sc = score(&r, &ThemeSignature::build::<&str>("", "", &[]), 2, 0.5);
        assert_eq!(sc, ThemeScore::neutral());
    }

    #[test]
    fn strict_mode_spares_connectors() {
        let strict = ThemeMode::from_strict(true);
        assert!(strict.keeps(FoundBy::Connector, true));
        assert!(!strict.keeps(FoundBy::Generated, true));
        assert!(strict.keeps(FoundBy::Generated, false));
        assert!(ThemeMode::Soft.keeps(FoundBy::Generated, true));
    }
}
