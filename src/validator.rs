// src/validator.rs
//! Reachability validator.
//!
//! One check per URL: HEAD with redirects followed; on 403/405 a single GET
//! whose body is never read. The outcome is always a [`ValidationResult`];
//! transport failures are encoded in its status, never returned as errors.
//!
//! `ValidationCache` memoizes results by input URL for the lifetime of one run.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::candidate::{ValidationResult, ValidationStatus};
use crate::telemetry::ensure_metrics_described;

pub const USER_AGENT: &str =
    "resource-reconciler/0.1 (+reachability check; HEAD then GET fallback)";

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

// bare host ("example.org/x", "www.example.org") typed without a scheme
static RE_BARE_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:www\.|[a-z0-9-]+(?:\.[a-z0-9-]+)+(?:[/:?#]|$))").unwrap()
});

/// Anything that can tell whether a URL answers.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ValidationResult;
    fn name(&self) -> &'static str;
}

/// Pre-flight: reject empty or non-http(s) input, add `https://` to bare hosts.
pub fn prepare_url(raw: &str) -> std::result::Result<Url, ValidationResult> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationResult::failed(
            raw,
            ValidationStatus::InvalidUrl,
            "EmptyURL",
        ));
    }

    let candidate = if !trimmed.contains("://") && RE_BARE_HOST.is_match(trimmed) {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };

    let parsed = Url::parse(&candidate).map_err(|e| {
        ValidationResult::failed(raw, ValidationStatus::InvalidUrl, format!("InvalidURL: {e}"))
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationResult::failed(
                raw,
                ValidationStatus::InvalidUrl,
                format!("UnsupportedScheme: {other}"),
            ))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationResult::failed(
            raw,
            ValidationStatus::InvalidUrl,
            "MissingHost",
        ));
    }
    Ok(parsed)
}

/// Map a final HTTP status to a result.
pub fn classify_status(
    input_url: &str,
    code: u16,
    final_url: &str,
    redirected: bool,
) -> ValidationResult {
    let (status, error) = match code {
        404 | 410 => (ValidationStatus::NotFound, None),
        200..=299 if redirected => (ValidationStatus::Redirected, None),
        200..=299 => (ValidationStatus::Ok, None),
        300..=399 => (ValidationStatus::Redirected, None),
        _ => (ValidationStatus::ServerError, Some(format!("HTTP {code}"))),
    };
    ValidationResult {
        input_url: input_url.to_string(),
        status,
        http_status: Some(code),
        final_url: Some(final_url.to_string()),
        error,
    }
}

/// Map a transport error to a result.
pub fn transport_failure(input_url: &str, err: &reqwest::Error) -> ValidationResult {
    if err.is_timeout() {
        return ValidationResult::failed(input_url, ValidationStatus::Timeout, "Timeout");
    }
    if err.is_builder() {
        return ValidationResult::failed(
            input_url,
            ValidationStatus::InvalidUrl,
            format!("InvalidURL: {err}"),
        );
    }
    if err.is_redirect() {
        return ValidationResult::failed(
            input_url,
            ValidationStatus::ConnectionError,
            "TooManyRedirects",
        );
    }
    let kind = if err.is_connect() {
        "ConnectError"
    } else {
        "RequestError"
    };
    debug!(target: "reconcile", url = input_url, error = %err, kind, "validation transport error");
    ValidationResult::failed(
        input_url,
        ValidationStatus::ConnectionError,
        format!("{kind}: {err}"),
    )
}

/// reqwest-backed probe.
#[derive(Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("building reachability HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ValidationResult {
        let target = match prepare_url(url) {
            Ok(u) => u,
            Err(failed) => return failed,
        };

        let resp = match self.http.head(target.as_str()).send().await {
            Ok(r) if matches!(r.status(), StatusCode::FORBIDDEN | StatusCode::METHOD_NOT_ALLOWED) => {
                // Body is dropped unread.
                match self.http.get(target.as_str()).send().await {
                    Ok(r) => r,
                    Err(e) => return transport_failure(url, &e),
                }
            }
            Ok(r) => r,
            Err(e) => return transport_failure(url, &e),
        };

        let redirected = resp.url().as_str() != target.as_str();
        classify_status(url, resp.status().as_u16(), resp.url().as_str(), redirected)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Stand-in for runs with `validate_urls` off, where the pipeline never probes.
/// Called directly, it reports every URL reachable as-is without touching the network.
pub struct DisabledProbe;

#[async_trait]
impl UrlProbe for DisabledProbe {
    async fn probe(&self, url: &str) -> ValidationResult {
        ValidationResult {
            input_url: url.to_string(),
            status: ValidationStatus::Ok,
            http_status: None,
            final_url: None,
            error: None,
        }
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Per-run memo of results keyed by input URL.
#[derive(Debug, Default)]
pub struct ValidationCache {
    entries: HashMap<String, ValidationResult>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&ValidationResult> {
        self.entries.get(url)
    }

    /// Cached result, or probe once and remember it.
    pub async fn validate(&mut self, probe: &dyn UrlProbe, url: &str) -> ValidationResult {
        if let Some(hit) = self.entries.get(url) {
            return hit.clone();
        }

        ensure_metrics_described();
        let t0 = Instant::now();
        let res = probe.probe(url).await;
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("reconcile_validate_ms").record(ms);
        counter!("reconcile_validation_total", "status" => res.status.as_str()).increment(1);
        debug!(
            target: "reconcile",
            url,
            probe = probe.name(),
            status = res.status.as_str(),
            http_status = ?res.http_status,
            "validated"
        );

        self.entries.insert(url.to_string(), res.clone());
        res
    }

    /// Validate a batch in order through the cache.
    pub async fn validate_many<S: AsRef<str>>(
        &mut self,
        probe: &dyn UrlProbe,
        urls: &[S],
    ) -> Vec<ValidationResult> {
        let mut out = Vec::with_capacity(urls.len());
        for u in urls {
            out.push(self.validate(probe, u.as_ref()).await);
        }
        out
    }
}
