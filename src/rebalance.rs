// src/rebalance.rs
//! Minima guard: make sure each list reaches its configured minimum by moving
//! borderline items across, without ever inventing new ones.
//!
//! Order of preference:
//! 1. datasets short: dataset-like sources first, then any non-PDF source as a
//!    last resort;
//! 2. sources short: datasets that are not dataset-like (or are PDFs) first,
//!    then any remaining dataset.
//!
//! When total supply is below both minima combined, step 2 may take back what
//! step 1 moved; the shortfall is left for the caller to report.
//!
//! Selection is always "first match in list order". Items are removed from one
//! list before being appended to the other, so no URL ends up in both.

use tracing::debug;

use crate::candidate::Candidate;
use crate::classify::{is_dataset_like_url, is_pdf_url};
use crate::telemetry::record_moved;

/// Read-only view the guard needs.
pub trait HasUrl {
    fn url(&self) -> &str;
}

impl HasUrl for Candidate {
    fn url(&self) -> &str {
        Candidate::url(self)
    }
}

/// Lists after the guard ran, plus how many items crossed over.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOutcome<T> {
    pub datasets: Vec<T>,
    pub sources: Vec<T>,
    pub moved_to_datasets: usize,
    pub moved_to_sources: usize,
}

impl<T> RebalanceOutcome<T> {
    pub fn moved(&self) -> bool {
        self.moved_to_datasets > 0 || self.moved_to_sources > 0
    }
}

fn take_first<T, F>(items: &mut Vec<T>, pred: F) -> Option<T>
where
    F: Fn(&T) -> bool,
{
    let i = items.iter().position(pred)?;
    Some(items.remove(i))
}

/// Move items between lists until both minima hold or supply runs out.
/// A no-op when both minima are already met.
pub fn rebalance<T, P, D, S>(
    mut datasets: Vec<T>,
    mut sources: Vec<T>,
    min_datasets: usize,
    min_sources: usize,
    is_dataset_like: P,
    to_dataset: D,
    to_source: S,
) -> RebalanceOutcome<T>
where
    T: HasUrl,
    P: Fn(&str) -> bool,
    D: Fn(T) -> T,
    S: Fn(T) -> T,
{
    let mut moved_ds = 0usize;
    let mut moved_src = 0usize;

    if datasets.len() >= min_datasets && sources.len() >= min_sources {
        return RebalanceOutcome {
            datasets,
            sources,
            moved_to_datasets: 0,
            moved_to_sources: 0,
        };
    }

    // 1a) dataset-like sources
    while datasets.len() < min_datasets {
        let Some(it) = take_first(&mut sources, |s| {
            let u = s.url();
            is_dataset_like(u) && !is_pdf_url(u)
        }) else {
            break;
        };
        datasets.push(to_dataset(it));
        moved_ds += 1;
    }
    // 1b) any non-PDF source
    while datasets.len() < min_datasets {
        let Some(it) = take_first(&mut sources, |s| !is_pdf_url(s.url())) else {
            break;
        };
        datasets.push(to_dataset(it));
        moved_ds += 1;
    }

    // 2a) source-like or PDF datasets
    while sources.len() < min_sources {
        let Some(it) = take_first(&mut datasets, |d| {
            let u = d.url();
            !is_dataset_like(u) || is_pdf_url(u)
        }) else {
            break;
        };
        sources.push(to_source(it));
        moved_src += 1;
    }
    // 2b) any dataset
    while sources.len() < min_sources {
        let Some(it) = take_first(&mut datasets, |_| true) else {
            break;
        };
        sources.push(to_source(it));
        moved_src += 1;
    }

    if moved_ds > 0 || moved_src > 0 {
        debug!(
            target: "reconcile",
            moved_to_datasets = moved_ds,
            moved_to_sources = moved_src,
            datasets = datasets.len(),
            sources = sources.len(),
            "min_guard_applied"
        );
    }

    RebalanceOutcome {
        datasets,
        sources,
        moved_to_datasets: moved_ds,
        moved_to_sources: moved_src,
    }
}

/// [`rebalance`] over candidates with the URL classifier and re-tagging converters.
pub fn rebalance_candidates(
    datasets: Vec<Candidate>,
    sources: Vec<Candidate>,
    min_datasets: usize,
    min_sources: usize,
) -> RebalanceOutcome<Candidate> {
    let out = rebalance(
        datasets,
        sources,
        min_datasets,
        min_sources,
        is_dataset_like_url,
        Candidate::into_dataset,
        Candidate::into_source,
    );
    record_moved("to_datasets", out.moved_to_datasets);
    record_moved("to_sources", out.moved_to_sources);
    out
}
