// src/trust.rs
//! # Trust list
//!
//! Curated allow-list of publisher domains. A host is trusted when it equals a
//! listed domain or is a subdomain of one (`www.data.gouv.fr` matches
//! `data.gouv.fr`, `evildata.gouv.fr` does not).
//!
//! Scoring always looks at the resolved URL, so a redirect into a trusted domain
//! earns the boost.

use url::Url;

/// Lowercased host of an absolute URL, without a trailing dot.
pub fn host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let h = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if h.is_empty() {
        None
    } else {
        Some(h)
    }
}

/// Exact or dot-boundary suffix match against `domains`, case-insensitive on both sides.
pub fn is_trusted<S: AsRef<str>>(host: &str, domains: &[S]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    domains.iter().any(|d| {
        let d = d.as_ref().trim().trim_end_matches('.').to_ascii_lowercase();
        let d = d.as_str();
        if d.is_empty() {
            return false;
        }
        host == d
            || host
                .strip_suffix(d)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// `1 + boost` for trusted hosts, `1` otherwise (unparsable URLs included).
pub fn trust_weight<S: AsRef<str>>(url: &str, boost: f32, domains: &[S]) -> f32 {
    match host(url) {
        Some(h) if is_trusted(&h, domains) => 1.0 + boost,
        _ => 1.0,
    }
}

/// Normalized allow-list plus its boost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrustList {
    domains: Vec<String>,
    boost: f32,
}

impl TrustList {
    /// Trim, lowercase, strip a leading `*.`/`.` and trailing dot, drop empties and repeats.
    pub fn new<I, S>(domains: I, boost: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for d in domains {
            let d = d
                .as_ref()
                .trim()
                .trim_start_matches("*.")
                .trim_start_matches('.')
                .trim_end_matches('.')
                .to_ascii_lowercase();
            if !d.is_empty() && !out.contains(&d) {
                out.push(d);
            }
        }
        Self {
            domains: out,
            boost,
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn contains_host(&self, host: &str) -> bool {
        is_trusted(host, &self.domains)
    }

    pub fn weight(&self, url: &str) -> f32 {
        trust_weight(url, self.boost, &self.domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &[&str] = &["data.gouv.fr", "zenodo.org"];

    #[test]
    fn exact_and_subdomain_match() {
        assert!(is_trusted("data.gouv.fr", LIST));
        assert!(is_trusted("www.data.gouv.fr", LIST));
        assert!(is_trusted("WWW.Data.Gouv.FR", LIST));
        assert!(is_trusted("sandbox.zenodo.org.", LIST));
    }

    #[test]
    fn suffix_must_sit_on_a_dot_boundary() {
        assert!(!is_trusted("evildata.gouv.fr", LIST));
        assert!(!is_trusted("gouv.fr", LIST));
        assert!(!is_trusted("zenodo.org.attacker.com", LIST));
    }

    #[test]
    fn weight_is_one_plus_boost() {
        assert!((trust_weight("https://www.data.gouv.fr/x", 0.15, LIST) - 1.15).abs() < 1e-6);
        assert_eq!(trust_weight("https://example.org/x", 0.15, LIST), 1.0);
        assert_eq!(trust_weight("not a url", 0.15, LIST), 1.0);
    }

    #[test]
    fn list_is_normalized() {
        let t = TrustList::new([" Data.Gouv.FR ", "", "*.zenodo.org", "data.gouv.fr"], 0.2);
        assert_eq!(t.domains(), &["data.gouv.fr".to_string(), "zenodo.org".to_string()]);
        assert!(t.contains_host("files.zenodo.org"));
        assert!((t.weight("https://zenodo.org/records/1") - 1.2).abs() < 1e-6);
    }

    #[test]
    fn raw_entries_match_regardless_of_case() {
        assert!(is_trusted("www.data.gouv.fr", &["Data.Gouv.FR"]));
        assert!(is_trusted("zenodo.org", &[" Zenodo.org. "]));
        assert!(!is_trusted("evildata.gouv.fr", &["DATA.GOUV.FR"]));
    }

    #[test]
    fn empty_entries_never_match() {
        assert!(!is_trusted("example.org", &[""]));
    }
}
