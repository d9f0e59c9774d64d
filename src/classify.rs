// src/classify.rs
//! URL classifier: turns a URL (+ optional title/snippet) into structural signals
//! and a dataset-like / source-like verdict.
//!
//! Everything here is pure and total. An unparsable URL yields `Source` with all
//! flags false.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::candidate::Category;

/// Path/query tokens hinting at data catalogs, statistics portals and APIs.
const DATA_PATH_TOKENS: &[&str] = &[
    "dataset",
    "datasets",
    "datastore",
    "data",
    "statistics",
    "statistiques",
    "statistique",
    "search",
    "recherche",
    "catalog",
    "catalogue",
    "table",
    "api",
    "download",
    "geonetwork",
];

/// Data-service tokens accepted as a format signal in URL tokens.
const DATA_SERVICE_TOKENS: &[&str] = &["wfs", "wms", "api"];

static RE_URL_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());
static RE_FORMAT_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(csv|json|geojson|parquet)\b").unwrap());
static RE_TEXT_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(csv|json|geojson|parquet|wfs|wms|api)\b").unwrap());
static RE_PDF_IN_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf\b").unwrap());

/// All structural signals for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlSignals {
    pub is_pdf: bool,
    pub is_near_root: bool,
    pub is_root_listing: bool,
    pub has_path_token: bool,
    pub has_format_signal: bool,
    pub category: Category,
}

impl UrlSignals {
    fn unparsable() -> Self {
        Self {
            is_pdf: false,
            is_near_root: false,
            is_root_listing: false,
            has_path_token: false,
            has_format_signal: false,
            category: Category::Source,
        }
    }
}

fn parse(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    if parsed.cannot_be_a_base() {
        return None;
    }
    Some(parsed)
}

fn segments(u: &Url) -> Vec<String> {
    u.path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

fn non_empty_query(u: &Url) -> Option<&str> {
    u.query().filter(|q| !q.is_empty())
}

/// Lowercased alphanumeric tokens of path + query.
fn url_tokens(u: &Url) -> Vec<String> {
    let mut hay = u.path().to_ascii_lowercase();
    if let Some(q) = u.query() {
        hay.push(' ');
        hay.push_str(&q.to_ascii_lowercase());
    }
    RE_URL_TOKEN
        .find_iter(&hay)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn pdf(u: &Url) -> bool {
    u.path().to_ascii_lowercase().ends_with(".pdf")
        || non_empty_query(u).is_some_and(|q| RE_PDF_IN_QUERY.is_match(q))
}

fn near_root(u: &Url) -> bool {
    segments(u).len() <= 1
}

fn path_token(u: &Url) -> bool {
    url_tokens(u)
        .iter()
        .any(|t| DATA_PATH_TOKENS.contains(&t.as_str()))
}

fn format_signal(u: &Url, text: &str) -> bool {
    let mut path_and_query = u.path().to_string();
    if let Some(q) = u.query() {
        path_and_query.push('?');
        path_and_query.push_str(q);
    }
    RE_FORMAT_EXT.is_match(&path_and_query)
        || url_tokens(u)
            .iter()
            .any(|t| DATA_SERVICE_TOKENS.contains(&t.as_str()))
        || RE_TEXT_FORMAT.is_match(text)
}

fn root_listing(u: &Url) -> bool {
    let segs = segments(u);
    let Some(last) = segs.last() else {
        return false;
    };
    let listing_word = last == "dataset" || last == "datasets";
    listing_word && (segs.len() <= 2 || non_empty_query(u).is_some())
}

/// Classify a URL. `title` and `snippet` only feed the format signal.
pub fn classify(url: &str, title: Option<&str>, snippet: Option<&str>) -> UrlSignals {
    let Some(u) = parse(url) else {
        return UrlSignals::unparsable();
    };

    let text = format!(
        "{} {}",
        title.unwrap_or_default(),
        snippet.unwrap_or_default()
    );

    let is_pdf = pdf(&u);
    let is_near_root = near_root(&u);
    let has_path_token = path_token(&u);
    let has_format_signal = format_signal(&u, &text);

    let category = if is_pdf {
        Category::Source
    } else if !is_near_root && (has_path_token || has_format_signal) {
        Category::Dataset
    } else {
        Category::Source
    };

    UrlSignals {
        is_pdf,
        is_near_root,
        is_root_listing: root_listing(&u),
        has_path_token,
        has_format_signal,
        category,
    }
}

/// True if the path ends in `.pdf` or the query names a `.pdf` file.
pub fn is_pdf_url(url: &str) -> bool {
    parse(url).is_some_and(|u| pdf(&u))
}

/// Homepage-like: at most one non-empty path segment.
pub fn is_near_root(url: &str) -> bool {
    parse(url).is_some_and(|u| near_root(&u))
}

/// A catalog listing page such as `/datasets/` or `/fr/datasets?page=2`.
pub fn is_dataset_root_listing(url: &str) -> bool {
    parse(url).is_some_and(|u| root_listing(&u))
}

/// Whole-token match of a data-ish path/query token.
pub fn has_data_path_token(url: &str) -> bool {
    parse(url).is_some_and(|u| path_token(&u))
}

/// File-format extension or data-service token in the URL or accompanying text.
pub fn has_data_format_signal(url: &str, text: &str) -> bool {
    match parse(url) {
        Some(u) => format_signal(&u, text),
        None => RE_TEXT_FORMAT.is_match(text),
    }
}

/// URL-only verdict used for splitting generated items and for rebalancing.
pub fn is_dataset_like_url(url: &str) -> bool {
    classify(url, None, None).category == Category::Dataset
}
