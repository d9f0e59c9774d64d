// src/ranking.rs
//! Composite weight and ordering.
//!
//! `final = trust × theme × homepage × datasets_path + structural`, where the
//! first four factors are multiplicative soft weights and `structural` is an
//! additive pass over the URL signals (format/path boosts, PDF, homepage and
//! root-listing penalties). Items whose reachability check failed lose
//! [`UNREACHABLE_PENALTY`] on top. Result is clamped to the configured floor.
//!
//! Ordering is a stable descending sort: equal weights keep encounter order.

use url::Url;

use crate::candidate::{Candidate, Resource};
use crate::classify::{self, UrlSignals};
use crate::config::ReconcileConfig;
use crate::trust::TrustList;

/// Subtracted when a validation result is attached and not accessible.
pub const UNREACHABLE_PENALTY: f32 = 0.5;

/// `1 - penalty` for near-root URLs, `1` otherwise.
pub fn homepage_weight(url: &str, penalty: f32) -> f32 {
    if classify::is_near_root(url) {
        1.0 - penalty
    } else {
        1.0
    }
}

/// `1 + boost` when the URL path contains `/datasets`.
pub fn datasets_path_boost(url: &str, boost: f32) -> f32 {
    let hit = Url::parse(url.trim())
        .map(|u| u.path().to_ascii_lowercase().contains("/datasets"))
        .unwrap_or(false);
    if hit {
        1.0 + boost
    } else {
        1.0
    }
}

/// Additive boosts and penalties from URL structure.
pub fn structural_adjustment(signals: &UrlSignals, cfg: &ReconcileConfig) -> f32 {
    let mut adj = 0.0_f32;
    if signals.has_format_signal {
        adj += cfg.dataset_format_boost;
    }
    if signals.has_path_token {
        adj += cfg.dataset_path_boost;
    }
    if signals.is_pdf {
        adj -= cfg.pdf_soft_penalty;
    }
    if signals.is_root_listing {
        adj -= cfg.homepage_soft_penalty + cfg.dataset_root_listing_penalty;
    } else if signals.is_near_root {
        adj -= cfg.homepage_soft_penalty;
    }
    adj
}

/// Config-derived weighting parameters for one run.
#[derive(Debug, Clone)]
pub struct Ranker {
    cfg: ReconcileConfig,
    trust: TrustList,
}

impl Ranker {
    pub fn new(cfg: &ReconcileConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            trust: cfg.trust_list(),
        }
    }

    /// Composite weight of a resource given its theme factor.
    /// Uses the resolved URL when validation produced one.
    pub fn final_weight(&self, res: &Resource, theme_weight: f32) -> f32 {
        let url = res.url_for_weight();
        let signals = classify::classify(url, Some(&res.title), res.description.as_deref());

        let product = self.trust.weight(url)
            * theme_weight
            * homepage_weight(url, self.cfg.homepage_soft_penalty)
            * datasets_path_boost(url, self.cfg.datasets_path_soft_boost);
        let mut w = product + structural_adjustment(&signals, &self.cfg);
        if res.validation.as_ref().is_some_and(|v| !v.is_accessible()) {
            w -= UNREACHABLE_PENALTY;
        }

        let floor = self.cfg.weight_floor();
        if w.is_finite() {
            w.max(floor)
        } else {
            floor
        }
    }

    /// Stamp `weight` on every candidate. `theme_of` yields each item's theme factor.
    pub fn apply<F>(&self, items: &mut [Candidate], mut theme_of: F)
    where
        F: FnMut(&Resource) -> f32,
    {
        for c in items.iter_mut() {
            let theme = theme_of(c.resource());
            let w = self.final_weight(c.resource(), theme);
            c.resource_mut().weight = w;
        }
    }
}

/// Stable sort, highest weight first.
pub fn sort_by_weight(items: &mut [Candidate]) {
    items.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
}
