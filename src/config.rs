// src/config.rs
//! Reconciliation tunables.
//!
//! Loaded from the `[reconcile]` table of a TOML file; every key is optional.
//! Path resolution:
//! 1) `$RECONCILE_CONFIG_PATH` (error if set but unreadable)
//! 2) `config/reconcile.toml`
//! 3) built-in defaults
//!
//! A few switches can be flipped from the environment afterwards
//! (`RECONCILE_VALIDATE_URLS`, `RECONCILE_FILTER_NOT_FOUND`,
//! `RECONCILE_THEME_STRICT`, `RECONCILE_VALIDATION_TIMEOUT_SECS`).

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::theme::ThemeMode;
use crate::trust::TrustList;

pub const ENV_RECONCILE_CONFIG_PATH: &str = "RECONCILE_CONFIG_PATH";
pub const DEFAULT_RECONCILE_CONFIG_PATH: &str = "config/reconcile.toml";

pub const ENV_VALIDATE_URLS: &str = "RECONCILE_VALIDATE_URLS";
pub const ENV_FILTER_NOT_FOUND: &str = "RECONCILE_FILTER_NOT_FOUND";
pub const ENV_THEME_STRICT: &str = "RECONCILE_THEME_STRICT";
pub const ENV_VALIDATION_TIMEOUT_SECS: &str = "RECONCILE_VALIDATION_TIMEOUT_SECS";

const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    "data.gouv.fr",
    "data.gov",
    "open.canada.ca",
    "data.gov.uk",
    "data.europa.eu",
    "data.humdata.org",
    "worldbank.org",
    "kaggle.com",
    "github.com",
    "figshare.com",
    "zenodo.org",
];

fn default_min_datasets() -> usize {
    3
}
fn default_min_sources() -> usize {
    3
}
fn default_trusted_domains() -> Vec<String> {
    DEFAULT_TRUSTED_DOMAINS.iter().map(|d| d.to_string()).collect()
}
fn default_trusted_soft_weight() -> f32 {
    0.15
}
fn default_homepage_soft_penalty() -> f32 {
    0.20
}
fn default_datasets_path_soft_boost() -> f32 {
    0.05
}
fn default_dataset_root_listing_penalty() -> f32 {
    0.15
}
fn default_pdf_soft_penalty() -> f32 {
    0.20
}
fn default_dataset_format_boost() -> f32 {
    0.25
}
fn default_dataset_path_boost() -> f32 {
    0.15
}
fn default_theme_min_unigram_hits() -> usize {
    2
}
fn default_theme_soft_penalty() -> f32 {
    0.15
}
fn default_filter_not_found() -> bool {
    true
}
fn default_validation_timeout_secs() -> u64 {
    5
}

/// All named tunables of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_min_datasets")]
    pub min_datasets_per_topic: usize,
    #[serde(default = "default_min_sources")]
    pub min_sources_per_topic: usize,

    #[serde(default = "default_trusted_domains")]
    pub trusted_domains: Vec<String>,
    /// Multiplicative boost for trusted hosts (`1 + w`).
    #[serde(default = "default_trusted_soft_weight")]
    pub trusted_soft_weight: f32,

    #[serde(default = "default_homepage_soft_penalty")]
    pub homepage_soft_penalty: f32,
    #[serde(default = "default_datasets_path_soft_boost")]
    pub datasets_path_soft_boost: f32,
    #[serde(default = "default_dataset_root_listing_penalty")]
    pub dataset_root_listing_penalty: f32,
    #[serde(default = "default_pdf_soft_penalty")]
    pub pdf_soft_penalty: f32,
    #[serde(default = "default_dataset_format_boost")]
    pub dataset_format_boost: f32,
    #[serde(default = "default_dataset_path_boost")]
    pub dataset_path_boost: f32,

    #[serde(default)]
    pub theme_filter_strict: bool,
    #[serde(default = "default_theme_min_unigram_hits")]
    pub theme_min_unigram_hits: usize,
    #[serde(default = "default_theme_soft_penalty")]
    pub theme_soft_penalty: f32,

    #[serde(default)]
    pub validate_urls: bool,
    #[serde(default = "default_filter_not_found")]
    pub filter_not_found: bool,
    #[serde(default = "default_validation_timeout_secs")]
    pub validation_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            min_datasets_per_topic: default_min_datasets(),
            min_sources_per_topic: default_min_sources(),
            trusted_domains: default_trusted_domains(),
            trusted_soft_weight: default_trusted_soft_weight(),
            homepage_soft_penalty: default_homepage_soft_penalty(),
            datasets_path_soft_boost: default_datasets_path_soft_boost(),
            dataset_root_listing_penalty: default_dataset_root_listing_penalty(),
            pdf_soft_penalty: default_pdf_soft_penalty(),
            dataset_format_boost: default_dataset_format_boost(),
            dataset_path_boost: default_dataset_path_boost(),
            theme_filter_strict: false,
            theme_min_unigram_hits: default_theme_min_unigram_hits(),
            theme_soft_penalty: default_theme_soft_penalty(),
            validate_urls: false,
            filter_not_found: default_filter_not_found(),
            validation_timeout_secs: default_validation_timeout_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    reconcile: ReconcileConfig,
}

// "1"/"true"/"yes"/"on" and their negatives; anything else is ignored
fn parse_bool_env(raw: Option<String>) -> Option<bool> {
    let v = raw?.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_secs_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_negative_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        fallback
    }
}

fn penalty_or(v: f32, fallback: f32) -> f32 {
    non_negative_or(v, fallback).clamp(0.0, 1.0)
}

impl ReconcileConfig {
    /// Parse the `[reconcile]` table of a TOML document and sanitize it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(toml_str).context("parsing reconcile config")?;
        let mut cfg = file.reconcile;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load from an explicit file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading reconcile config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file (env → default path → built-ins), then apply env overrides.
    pub fn from_toml() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_RECONCILE_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_RECONCILE_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::from_path(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_RECONCILE_CONFIG_PATH);
                if pb.exists() {
                    Self::from_path(&pb)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply the env switches on top of whatever was loaded.
    pub fn apply_env_overrides(&mut self) {
        if let Some(b) = parse_bool_env(std::env::var(ENV_VALIDATE_URLS).ok()) {
            self.validate_urls = b;
        }
        if let Some(b) = parse_bool_env(std::env::var(ENV_FILTER_NOT_FOUND).ok()) {
            self.filter_not_found = b;
        }
        if let Some(b) = parse_bool_env(std::env::var(ENV_THEME_STRICT).ok()) {
            self.theme_filter_strict = b;
        }
        if let Some(s) = parse_secs_env(std::env::var(ENV_VALIDATION_TIMEOUT_SECS).ok()) {
            self.validation_timeout_secs = s;
        }
        self.sanitize();
    }

    /// Replace out-of-range values with defaults and normalize the domain list.
    pub fn sanitize(&mut self) {
        let d = Self::default();

        self.trusted_soft_weight = non_negative_or(self.trusted_soft_weight, d.trusted_soft_weight);
        self.datasets_path_soft_boost =
            non_negative_or(self.datasets_path_soft_boost, d.datasets_path_soft_boost);
        self.dataset_format_boost =
            non_negative_or(self.dataset_format_boost, d.dataset_format_boost);
        self.dataset_path_boost = non_negative_or(self.dataset_path_boost, d.dataset_path_boost);

        self.homepage_soft_penalty = penalty_or(self.homepage_soft_penalty, d.homepage_soft_penalty);
        self.dataset_root_listing_penalty = penalty_or(
            self.dataset_root_listing_penalty,
            d.dataset_root_listing_penalty,
        );
        self.pdf_soft_penalty = penalty_or(self.pdf_soft_penalty, d.pdf_soft_penalty);
        self.theme_soft_penalty = penalty_or(self.theme_soft_penalty, d.theme_soft_penalty);

        if self.validation_timeout_secs == 0 {
            self.validation_timeout_secs = 1;
        }

        self.trusted_domains = TrustList::new(&self.trusted_domains, 0.0)
            .domains()
            .to_vec();
    }

    /// Lowest composite weight any candidate can end up with.
    pub fn weight_floor(&self) -> f32 {
        -(self.pdf_soft_penalty + self.homepage_soft_penalty + self.dataset_root_listing_penalty)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs.max(1))
    }

    pub fn theme_mode(&self) -> ThemeMode {
        ThemeMode::from_strict(self.theme_filter_strict)
    }

    pub fn trust_list(&self) -> TrustList {
        TrustList::new(&self.trusted_domains, self.trusted_soft_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = ReconcileConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ReconcileConfig::default());
        assert_eq!(cfg.min_datasets_per_topic, 3);
        assert!(cfg.filter_not_found);
        assert!(!cfg.validate_urls);
        assert_eq!(cfg.trusted_domains.len(), 11);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let cfg = ReconcileConfig::from_toml_str(
            r#"
            [reconcile]
            min_datasets_per_topic = 5
            theme_filter_strict = true
            trusted_domains = [" Example.ORG ", "example.org", ""]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.min_datasets_per_topic, 5);
        assert_eq!(cfg.min_sources_per_topic, 3);
        assert!(cfg.theme_filter_strict);
        assert_eq!(cfg.trusted_domains, vec!["example.org".to_string()]);
        assert!((cfg.pdf_soft_penalty - 0.20).abs() < 1e-6);
    }

    #[test]
    fn sanitize_repairs_bad_values() {
        let mut cfg = ReconcileConfig {
            trusted_soft_weight: -1.0,
            homepage_soft_penalty: 3.0,
            pdf_soft_penalty: f32::NAN,
            validation_timeout_secs: 0,
            ..ReconcileConfig::default()
        };
        cfg.sanitize();
        assert!((cfg.trusted_soft_weight - 0.15).abs() < 1e-6);
        assert_eq!(cfg.homepage_soft_penalty, 1.0);
        assert!((cfg.pdf_soft_penalty - 0.20).abs() < 1e-6);
        assert_eq!(cfg.validation_timeout_secs, 1);
    }

    #[test]
    fn floor_sums_the_three_penalties() {
        let cfg = ReconcileConfig::default();
        assert!((cfg.weight_floor() + 0.55).abs() < 1e-6);
    }

    #[test]
    fn bool_env_parsing() {
        assert_eq!(parse_bool_env(Some(" YES ".into())), Some(true));
        assert_eq!(parse_bool_env(Some("0".into())), Some(false));
        assert_eq!(parse_bool_env(Some("maybe".into())), None);
        assert_eq!(parse_bool_env(None), None);
        assert_eq!(parse_secs_env(Some("12".into())), Some(12));
        assert_eq!(parse_secs_env(Some("-3".into())), None);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(ReconcileConfig::from_toml_str("[reconcile]\nmin_datasets_per_topic = \"x\"").is_err());
    }
}
