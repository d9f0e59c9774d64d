// src/pipeline.rs
//! Per-topic reconciliation and the run-level driver.
//!
//! Flow for one topic:
//! malformed drop → classify generated → merge (connector first) → dedupe →
//! validate (+404 filter) → dedupe on resolved URLs → cross-list dedupe →
//! theme → richness backfill → weight + stable sort → minima guard.
//!
//! Nothing here fails: every degraded outcome shows up in [`TopicReport`].

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::candidate::{Candidate, FoundBy, Resource, TopicInput, ValidationStatus};
use crate::classify::classify;
use crate::config::ReconcileConfig;
use crate::dedupe::{dedupe_across, dedupe_within};
use crate::ranking::{sort_by_weight, Ranker};
use crate::rebalance::rebalance_candidates;
use crate::richness::{richness_score, Clock, SystemClock};
use crate::telemetry::{ensure_metrics_described, reason, record_dropped};
use crate::theme::{self, ThemeScore, ThemeSignature};
use crate::validator::{DisabledProbe, HttpProbe, UrlProbe, ValidationCache};

/// What happened to one topic's candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicReport {
    pub received: usize,
    pub malformed: usize,
    /// Same-list duplicates, before and after URL resolution.
    pub duplicates: usize,
    /// Sources dropped because a dataset has the same URL.
    pub cross_duplicates: usize,
    pub not_found: usize,
    /// Off-theme generated items (dropped in strict mode, demoted otherwise).
    pub off_theme: usize,
    pub moved_to_datasets: usize,
    pub moved_to_sources: usize,
    pub dataset_shortfall: usize,
    pub source_shortfall: usize,
}

impl TopicReport {
    pub fn is_under_quota(&self) -> bool {
        self.dataset_shortfall > 0 || self.source_shortfall > 0
    }
}

/// Final ordered lists for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicResources {
    pub index: usize,
    pub title: String,
    pub datasets: Vec<Candidate>,
    pub sources: Vec<Candidate>,
    pub report: TopicReport,
}

/// One reconciliation run: config, probe and the run-scoped validation cache.
pub struct Reconciler {
    config: ReconcileConfig,
    ranker: Ranker,
    probe: Box<dyn UrlProbe>,
    cache: ValidationCache,
    clock: Box<dyn Clock>,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig, probe: Box<dyn UrlProbe>) -> Self {
        Self {
            ranker: Ranker::new(&config),
            config,
            probe,
            cache: ValidationCache::new(),
            clock: Box::new(SystemClock),
        }
    }

    /// HTTP probe when `validate_urls` is on. Otherwise a [`DisabledProbe`] fills
    /// the slot and nothing is probed.
    pub fn with_http(config: ReconcileConfig) -> anyhow::Result<Self> {
        let probe: Box<dyn UrlProbe> = if config.validate_urls {
            Box::new(HttpProbe::new(config.timeout())?)
        } else {
            Box::new(DisabledProbe)
        };
        Ok(Self::new(config, probe))
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    /// Topics one after another, sharing the validation cache.
    pub async fn reconcile_run(&mut self, topics: Vec<TopicInput>) -> Vec<TopicResources> {
        let mut out = Vec::with_capacity(topics.len());
        for t in topics {
            out.push(self.reconcile_topic(t).await);
        }
        out
    }

    pub async fn reconcile_topic(&mut self, input: TopicInput) -> TopicResources {
        ensure_metrics_described();

        let TopicInput {
            index,
            title,
            rationale,
            keywords,
            connector,
            generated,
        } = input;

        let mut report = TopicReport {
            received: connector.len() + generated.len(),
            ..TopicReport::default()
        };
        counter!("reconcile_candidates_total").increment(report.received as u64);

        // Connector items keep their type; generated ones are typed by URL.
        let mut merged: Vec<Candidate> = Vec::with_capacity(report.received);
        for mut c in connector {
            if !c.resource().is_processable() {
                report.malformed += 1;
                continue;
            }
            let r = c.resource_mut();
            r.found_by = FoundBy::Connector;
            r.topic_index = index;
            merged.push(c);
        }
        for mut r in generated {
            if !r.is_processable() {
                report.malformed += 1;
                continue;
            }
            r.found_by = FoundBy::Generated;
            r.topic_index = index;
            let signals = classify(&r.url, Some(&r.title), r.description.as_deref());
            merged.push(Candidate::new(signals.category, r));
        }
        record_dropped(reason::MALFORMED, report.malformed);

        let (datasets, sources): (Vec<Candidate>, Vec<Candidate>) =
            merged.into_iter().partition(Candidate::is_dataset);

        let (mut datasets, d1) = dedupe_within(datasets);
        let (mut sources, d2) = dedupe_within(sources);
        report.duplicates += d1 + d2;

        if self.config.validate_urls {
            datasets = self.validate_list(datasets, &mut report).await;
            sources = self.validate_list(sources, &mut report).await;

            // Redirects can collapse distinct inputs onto one URL.
            let (ds, d1) = dedupe_within(datasets);
            let (src, d2) = dedupe_within(sources);
            datasets = ds;
            sources = src;
            report.duplicates += d1 + d2;
        }
        record_dropped(reason::NOT_FOUND, report.not_found);
        record_dropped(reason::DUPLICATE, report.duplicates);

        let (mut sources, cross) = dedupe_across(&datasets, sources);
        report.cross_duplicates = cross;
        record_dropped(reason::CROSS_DUPLICATE, cross);

        let sig = ThemeSignature::build(&title, &rationale, keywords.as_slice());
        self.theme_filter(&mut datasets, &sig, &mut report);
        self.theme_filter(&mut sources, &sig, &mut report);

        for c in datasets.iter_mut().chain(sources.iter_mut()) {
            let r = c.resource_mut();
            if r.found_by == FoundBy::Connector && r.richness.is_none() {
                r.richness = Some(richness_score(r, self.clock.as_ref()));
            }
        }

        self.ranker
            .apply(&mut datasets, |r| self.theme_score(r, &sig).weight);
        self.ranker
            .apply(&mut sources, |r| self.theme_score(r, &sig).weight);
        sort_by_weight(&mut datasets);
        sort_by_weight(&mut sources);

        let min_d = self.config.min_datasets_per_topic;
        let min_s = self.config.min_sources_per_topic;
        let balanced = rebalance_candidates(datasets, sources, min_d, min_s);
        report.moved_to_datasets = balanced.moved_to_datasets;
        report.moved_to_sources = balanced.moved_to_sources;
        report.dataset_shortfall = min_d.saturating_sub(balanced.datasets.len());
        report.source_shortfall = min_s.saturating_sub(balanced.sources.len());

        info!(
            target: "reconcile",
            topic = index,
            received = report.received,
            malformed = report.malformed,
            duplicates = report.duplicates,
            cross_duplicates = report.cross_duplicates,
            not_found = report.not_found,
            off_theme = report.off_theme,
            datasets = balanced.datasets.len(),
            sources = balanced.sources.len(),
            under_quota = report.is_under_quota(),
            "topic reconciled"
        );

        TopicResources {
            index,
            title,
            datasets: balanced.datasets,
            sources: balanced.sources,
            report,
        }
    }

    /// Attach validation results, adopt resolved URLs, drop 404s if configured.
    async fn validate_list(
        &mut self,
        items: Vec<Candidate>,
        report: &mut TopicReport,
    ) -> Vec<Candidate> {
        let mut kept = Vec::with_capacity(items.len());
        for mut c in items {
            let input = c.url().to_string();
            let res = self.cache.validate(self.probe.as_ref(), &input).await;

            if self.config.filter_not_found && res.status == ValidationStatus::NotFound {
                report.not_found += 1;
                continue;
            }

            let resolved = if res.is_accessible() {
                res.resolved_url().map(str::to_string)
            } else {
                None
            };
            let r = c.resource_mut();
            if let Some(u) = resolved {
                r.url = u;
            }
            r.validation = Some(res);
            kept.push(c);
        }
        kept
    }

    /// Connector items are never judged on theme.
    fn theme_score(&self, r: &Resource, sig: &ThemeSignature) -> ThemeScore {
        if r.found_by == FoundBy::Connector {
            return ThemeScore::neutral();
        }
        theme::score(
            r,
            sig,
            self.config.theme_min_unigram_hits,
            self.config.theme_soft_penalty,
        )
    }

    fn theme_filter(
        &self,
        items: &mut Vec<Candidate>,
        sig: &ThemeSignature,
        report: &mut TopicReport,
    ) {
        let mode = self.config.theme_mode();
        let mut off = 0usize;
        let mut dropped = 0usize;
        items.retain(|c| {
            let sc = self.theme_score(c.resource(), sig);
            if sc.off_theme {
                off += 1;
            }
            let keep = mode.keeps(c.found_by(), sc.off_theme);
            if !keep {
                dropped += 1;
            }
            keep
        });
        report.off_theme += off;
        record_dropped(reason::OFF_THEME, dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> TopicInput {
        TopicInput {
            index: 0,
            title: "Air quality in Paris".into(),
            rationale: "Hourly pollution measurements".into(),
            keywords: vec!["pollution".into()],
            connector: vec![],
            generated: vec![],
        }
    }

    #[tokio::test]
    async fn malformed_items_are_counted_and_skipped() {
        let mut t = topic();
        t.generated = vec![
            Resource::new("Air quality Paris", ""),
            Resource::new("Air quality Paris", "https://example.org/datasets/air-quality-paris"),
        ];
        let mut rec = Reconciler::new(ReconcileConfig::default(), Box::new(DisabledProbe));
        let out = rec.reconcile_topic(t).await;
        assert_eq!(out.report.received, 2);
        assert_eq!(out.report.malformed, 1);
        assert_eq!(out.datasets.len() + out.sources.len(), 1);
    }

    #[tokio::test]
    async fn connector_items_keep_their_type_and_get_richness() {
        let mut t = topic();
        let mut r = Resource::new("Stations", "https://example.org/about");
        r.formats = vec!["csv".into()];
        t.connector = vec![Candidate::Dataset(r)];
        let cfg = ReconcileConfig {
            min_datasets_per_topic: 0,
            min_sources_per_topic: 0,
            ..ReconcileConfig::default()
        };
        let mut rec = Reconciler::new(cfg, Box::new(DisabledProbe));
        let out = rec.reconcile_topic(t).await;
        assert_eq!(out.datasets.len(), 1);
        let d = out.datasets[0].resource();
        assert_eq!(d.found_by, FoundBy::Connector);
        assert_eq!(d.richness, Some(15));
    }

    #[tokio::test]
    async fn validation_off_leaves_cache_empty() {
        let mut t = topic();
        t.generated = vec![Resource::new("Air quality Paris", "https://example.org/datasets/air")];
        let mut rec = Reconciler::with_http(ReconcileConfig::default()).unwrap();
        let out = rec.reconcile_topic(t).await;
        assert!(rec.cache().is_empty());
        assert!(out
            .datasets
            .iter()
            .chain(&out.sources)
            .all(|c| c.resource().validation.is_none()));
    }

    #[test]
    fn under_quota_flag() {
        let r = TopicReport {
            source_shortfall: 1,
            ..TopicReport::default()
        };
        assert!(r.is_under_quota());
        assert!(!TopicReport::default().is_under_quota());
    }
}
