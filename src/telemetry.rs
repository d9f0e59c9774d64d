// src/telemetry.rs
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up once a recorder is installed).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "reconcile_candidates_total",
            "Candidates received across all topics."
        );
        describe_counter!(
            "reconcile_dropped_total",
            "Candidates dropped, labelled by reason."
        );
        describe_counter!(
            "reconcile_moved_total",
            "Candidates moved between lists by the minima guard."
        );
        describe_counter!(
            "reconcile_validation_total",
            "Reachability checks, labelled by status."
        );
        describe_histogram!(
            "reconcile_validate_ms",
            "Reachability check time in milliseconds."
        );
    });
}

/// Drop reasons used as the `reason` label.
pub mod reason {
    pub const MALFORMED: &str = "malformed";
    pub const DUPLICATE: &str = "duplicate";
    pub const CROSS_DUPLICATE: &str = "cross_duplicate";
    pub const NOT_FOUND: &str = "not_found";
    pub const OFF_THEME: &str = "off_theme";
}

pub fn record_dropped(reason: &'static str, n: usize) {
    if n > 0 {
        counter!("reconcile_dropped_total", "reason" => reason).increment(n as u64);
    }
}

pub fn record_moved(direction: &'static str, n: usize) {
    if n > 0 {
        counter!("reconcile_moved_total", "direction" => direction).increment(n as u64);
    }
}
