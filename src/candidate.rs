// src/candidate.rs
//! Candidate resources flowing through one reconciliation run.
//!
//! A `Resource` holds the fields every producer can supply. A `Candidate` is a
//! resource placed in exactly one output list (`Dataset` or `Source`); moving it
//! between lists goes through `into_dataset` / `into_source`, which re-tag the
//! same resource instead of copying fields around.

use serde::{Deserialize, Deserializer, Serialize};

/// Which output list a candidate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Dataset,
    Source,
}

/// Which kind of producer found the resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundBy {
    /// Open-data catalog connectors. Trusted to be on-topic.
    Connector,
    /// LLM suggestions and web-search hits.
    #[default]
    Generated,
}

/// Outcome class of a reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Redirected,
    NotFound,
    ServerError,
    Timeout,
    ConnectionError,
    InvalidUrl,
}

impl ValidationStatus {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Ok => "ok",
            ValidationStatus::Redirected => "redirected",
            ValidationStatus::NotFound => "not_found",
            ValidationStatus::ServerError => "server_error",
            ValidationStatus::Timeout => "timeout",
            ValidationStatus::ConnectionError => "connection_error",
            ValidationStatus::InvalidUrl => "invalid_url",
        }
    }
}

/// Result of one reachability check. Failures are encoded in `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// URL as submitted to the validator.
    pub input_url: String,
    pub status: ValidationStatus,
    #[serde(default)]
    pub http_status: Option<u16>,
    /// Resolved URL after redirects.
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ValidationResult {
    /// A check that never got a usable HTTP response.
    pub fn failed(input_url: &str, status: ValidationStatus, error: impl Into<String>) -> Self {
        Self {
            input_url: input_url.to_string(),
            status,
            http_status: None,
            final_url: None,
            error: Some(error.into()),
        }
    }

    /// True for `Ok` and `Redirected`.
    pub fn is_accessible(&self) -> bool {
        matches!(
            self.status,
            ValidationStatus::Ok | ValidationStatus::Redirected
        )
    }

    /// Resolved URL, if the check produced a non-empty one.
    pub fn resolved_url(&self) -> Option<&str> {
        self.final_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

fn default_weight() -> f32 {
    1.0
}

/// `null` reads as an empty string, like a missing key.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One URL-bearing item as supplied by a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    /// Organization or domain label supplied by the producer.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub provenance_name: String,
    #[serde(default)]
    pub found_by: FoundBy,
    #[serde(default)]
    pub topic_index: usize,
    /// Upstream quality score in 0..=100.
    #[serde(default)]
    pub richness: Option<u8>,
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub validation: Option<ValidationResult>,

    // Catalog metadata (connectors only, usually).
    #[serde(default)]
    pub formats: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    /// ISO-8601 timestamp or date.
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl Resource {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            url: url.into(),
            provenance_name: String::new(),
            found_by: FoundBy::Generated,
            topic_index: 0,
            richness: None,
            weight: default_weight(),
            validation: None,
            formats: Vec::new(),
            license: None,
            organization: None,
            last_modified: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_provenance(mut self, name: impl Into<String>) -> Self {
        self.provenance_name = name.into();
        self
    }

    pub fn found_by(mut self, found_by: FoundBy) -> Self {
        self.found_by = found_by;
        self
    }

    /// URL used for scoring and dedupe: the validated final URL when present.
    pub fn url_for_weight(&self) -> &str {
        self.validation
            .as_ref()
            .and_then(ValidationResult::resolved_url)
            .unwrap_or(self.url.as_str())
    }

    /// A resource without a URL cannot be processed.
    pub fn is_processable(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// A resource placed in exactly one output list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Candidate {
    Dataset(Resource),
    Source(Resource),
}

impl Candidate {
    pub fn new(category: Category, resource: Resource) -> Self {
        match category {
            Category::Dataset => Candidate::Dataset(resource),
            Category::Source => Candidate::Source(resource),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Candidate::Dataset(_) => Category::Dataset,
            Candidate::Source(_) => Category::Source,
        }
    }

    pub fn is_dataset(&self) -> bool {
        matches!(self, Candidate::Dataset(_))
    }

    pub fn resource(&self) -> &Resource {
        match self {
            Candidate::Dataset(r) | Candidate::Source(r) => r,
        }
    }

    pub fn resource_mut(&mut self) -> &mut Resource {
        match self {
            Candidate::Dataset(r) | Candidate::Source(r) => r,
        }
    }

    pub fn into_resource(self) -> Resource {
        match self {
            Candidate::Dataset(r) | Candidate::Source(r) => r,
        }
    }

    /// Re-type as a dataset. Identity and scores are kept.
    pub fn into_dataset(self) -> Self {
        Candidate::Dataset(self.into_resource())
    }

    /// Re-type as a documentation/source entry. Identity and scores are kept.
    pub fn into_source(self) -> Self {
        Candidate::Source(self.into_resource())
    }

    pub fn url(&self) -> &str {
        &self.resource().url
    }

    pub fn weight(&self) -> f32 {
        self.resource().weight
    }

    pub fn found_by(&self) -> FoundBy {
        self.resource().found_by
    }
}

/// Everything the producers hand over for one topic (angle).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicInput {
    pub index: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Connector results, already typed by the connector.
    #[serde(default)]
    pub connector: Vec<Candidate>,
    /// Generated suggestions, typed by URL classification.
    #[serde(default)]
    pub generated: Vec<Resource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_keep_identity() {
        let r = Resource::new("Air quality", "https://example.org/datasets/air")
            .with_provenance("example.org");
        let c = Candidate::Source(r.clone());
        let d = c.into_dataset();
        assert_eq!(d.category(), Category::Dataset);
        assert_eq!(d.resource(), &r);
        assert_eq!(d.into_source().category(), Category::Source);
    }

    #[test]
    fn url_for_weight_prefers_resolved_url() {
        let mut r = Resource::new("x", "http://old.example.org/a");
        assert_eq!(r.url_for_weight(), "http://old.example.org/a");

        r.validation = Some(ValidationResult {
            input_url: r.url.clone(),
            status: ValidationStatus::Redirected,
            http_status: Some(200),
            final_url: Some("https://new.example.org/a".into()),
            error: None,
        });
        assert_eq!(r.url_for_weight(), "https://new.example.org/a");

        // An empty final URL is ignored.
        if let Some(v) = r.validation.as_mut() {
            v.final_url = Some("  ".into());
        }
        assert_eq!(r.url_for_weight(), "http://old.example.org/a");
    }

    #[test]
    fn candidate_json_is_tagged_by_category() {
        let c = Candidate::Dataset(Resource::new("t", "https://a.org/x"));
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["category"], "dataset");
        assert_eq!(v["url"], "https://a.org/x");
        assert_eq!(v["found_by"], "generated");

        let back: Candidate = serde_json::from_value(v).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn missing_url_is_not_processable() {
        assert!(!Resource::new("t", "   ").is_processable());
        assert!(Resource::new("t", "https://a.org").is_processable());
    }

    #[test]
    fn null_url_reads_as_unprocessable() {
        let r: Resource =
            serde_json::from_str(r#"{"title": null, "url": null, "provenance_name": null}"#)
                .unwrap();
        assert_eq!(r.url, "");
        assert_eq!(r.title, "");
        assert!(!r.is_processable());

        let c: Candidate =
            serde_json::from_str(r#"{"category": "source", "title": "t", "url": null}"#).unwrap();
        assert!(!c.resource().is_processable());
    }

    #[test]
    fn invalid_url_status_label() {
        assert_eq!(ValidationStatus::InvalidUrl.as_str(), "invalid_url");
        let v = serde_json::to_value(ValidationStatus::InvalidUrl).unwrap();
        assert_eq!(v, "invalid_url");
    }
}
