// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod candidate;
pub mod classify;
pub mod config;
pub mod dedupe;
pub mod pipeline;
pub mod ranking;
pub mod rebalance;
pub mod richness;
pub mod telemetry;
pub mod theme;
pub mod trust;
pub mod validator;

// ---- Re-exports for stable public API ----
pub use crate::candidate::{
    Candidate, Category, FoundBy, Resource, TopicInput, ValidationResult, ValidationStatus,
};
pub use crate::config::ReconcileConfig;
pub use crate::pipeline::{Reconciler, TopicReport, TopicResources};
pub use crate::validator::{DisabledProbe, HttpProbe, UrlProbe, ValidationCache};
