// src/richness.rs
//! Catalog richness score (0..=100) for connector results that arrive without one.
//!
//! Four capped parts: format diversity (25), metadata (25), freshness (20) and
//! size (30). Time comes from an injected [`Clock`].

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::candidate::Resource;

const FORMAT_POINTS_MAX: u32 = 25;
const METADATA_POINTS_MAX: u32 = 25;

const OPEN_FORMATS: &[&str] = &["csv", "xls", "xlsx", "json", "geojson", "xml", "shp"];

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn present(v: Option<&str>) -> bool {
    v.is_some_and(|s| !s.trim().is_empty())
}

fn score_formats(formats: &[String]) -> u32 {
    if formats.is_empty() {
        return 0;
    }
    let uniques: HashSet<String> = formats.iter().map(|f| f.trim().to_lowercase()).collect();
    let open = uniques
        .iter()
        .filter(|f| OPEN_FORMATS.contains(&f.as_str()))
        .count() as u32;
    let mut pts = 5 * open;
    if uniques.len() >= 3 {
        pts += 5;
    }
    pts.min(FORMAT_POINTS_MAX)
}

fn score_metadata(res: &Resource) -> u32 {
    let mut pts = 0;
    if present(res.license.as_deref()) {
        pts += 10;
    }
    if present(res.organization.as_deref()) {
        pts += 10;
    }
    if present(res.description.as_deref()) {
        pts += 5;
    }
    pts.min(METADATA_POINTS_MAX)
}

/// RFC 3339, naive ISO datetime or plain date; naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn score_freshness(last_modified: Option<&str>, clock: &dyn Clock) -> u32 {
    let Some(ts) = last_modified.and_then(parse_timestamp) else {
        return 0;
    };
    match (clock.now() - ts).num_days() {
        d if d < 30 => 20,
        d if d < 180 => 15,
        d if d < 365 => 10,
        d if d < 730 => 5,
        _ => 0,
    }
}

// one format ~ one distribution
fn score_size(n_resources: usize) -> u32 {
    match n_resources {
        n if n >= 5 => 30,
        n if n >= 3 => 20,
        n if n >= 1 => 10,
        _ => 0,
    }
}

/// Total richness, capped at 100.
pub fn richness_score(res: &Resource, clock: &dyn Clock) -> u8 {
    let total = score_formats(&res.formats)
        + score_metadata(res)
        + score_freshness(res.last_modified.as_deref(), clock)
        + score_size(res.formats.len());
    total.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    fn rich(last_modified: &str) -> Resource {
        let mut r = Resource::new("Jeu de données", "https://example.com/dataset")
            .with_description("Jeu très complet et bien documenté.");
        r.formats = vec!["csv".into(), "json".into()];
        r.organization = Some("INSEE".into());
        r.license = Some("ETALAB".into());
        r.last_modified = Some(last_modified.into());
        r
    }

    #[test]
    fn fresh_documented_dataset() {
        let c = clock();
        let ten_days = (c.0 - Duration::days(10)).to_rfc3339();
        // formats 10 + metadata 25 + freshness 20 + size 10
        assert_eq!(richness_score(&rich(&ten_days), &c), 65);
    }

    #[test]
    fn freshness_bands() {
        let c = clock();
        for (days, pts) in [(0, 20), (29, 20), (30, 15), (179, 15), (200, 10), (400, 5), (800, 0)] {
            let ts = (c.0 - Duration::days(days)).to_rfc3339();
            assert_eq!(score_freshness(Some(&ts), &c), pts, "{days} days");
        }
        assert_eq!(score_freshness(Some("yesterday"), &c), 0);
        assert_eq!(score_freshness(None, &c), 0);
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2025-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2025-05-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2025-05-01").is_some());
        assert!(parse_timestamp("01/05/2025").is_none());
    }

    #[test]
    fn format_diversity_is_capped() {
        let f: Vec<String> = ["CSV", "csv", "xls", "xlsx", "json", "geojson", "xml", "shp"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(score_formats(&f), 25);
        assert_eq!(score_formats(&["pdf".into(), "doc".into(), "zip".into()]), 5);
        assert_eq!(score_size(f.len()), 30);
    }

    #[test]
    fn bare_resource_scores_zero_and_total_is_bounded() {
        let c = clock();
        assert_eq!(richness_score(&Resource::new("t", "https://a.org/x"), &c), 0);

        let mut r = rich(&c.0.to_rfc3339());
        r.formats = OPEN_FORMATS.iter().map(|s| s.to_string()).collect();
        assert_eq!(richness_score(&r, &c), 100);
    }
}
