//! Ad classification policy.
//!
//! The [`AdClassifier`] trait separates detection policy from the scan
//! mechanics: the classifier decides which selectors to query and which
//! scanned candidates count as ads. [`SignatureClassifier`] is the
//! built-in policy, matching known ad-server URLs and markup patterns.

// ============================================================================
// Imports
// ============================================================================

use std::sync::OnceLock;

use regex::Regex;

use super::AdCandidate;

// ============================================================================
// Constants
// ============================================================================

/// Selectors queried during a scan. Deliberately wider than the
/// definitive set; classification narrows the matches down.
const SCAN_SELECTORS: &[&str] = &[
    "iframe[src*=\"ads\"]",
    "iframe[src*=\"doubleclick\"]",
    "iframe[src*=\"googlesyndication\"]",
    "div[data-ad-unit]",
    "div[data-ad-client]",
    "div[data-ad-slot]",
    "div[data-testid*=\"ad\"]",
    "div[aria-label*=\"ad\" i]",
    "ins.adsbygoogle",
    "div[id^=\"google_ads_iframe\"]",
    "div[id^=\"div-gpt-ad\"]",
    "div[class*=\"AdContainer\"]",
    "div[class*=\"ad-container\"]",
    "div[class*=\"advertisement\"]",
];

/// Selectors that identify an ad on their own.
const DEFINITIVE_SELECTORS: &[&str] = &[
    "iframe[src*=\"ads\"]",
    "div[data-ad-unit]",
    "div[data-ad-client]",
    "div[data-ad-slot]",
    "div[data-testid=\"ad\"]",
    "div[aria-label*=\"Ad\"]",
    "ins.adsbygoogle",
    "div[id^=\"google_ads_iframe\"]",
    "div[id^=\"div-gpt-ad\"]",
    "div[class*=\"AdContainer\"]",
    "div[class*=\"ad-container\"]",
    "div[class*=\"advertisement\"]",
];

/// URL patterns of known ad servers, applied to iframe sources.
fn ad_server_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)ads?\.(doubleclick|google|facebook|amazon)\.",
            r"(?i)(googleads|doubleclick)\.g\.doubleclick\.net",
            r"(?i)pagead2\.googlesyndication\.com",
            r"(?i)adservice\.google\.",
            r"(?i)securepubads\.g\.doubleclick\.net",
            r"(?i)tpc\.googlesyndication\.com",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("invalid ad server regex"))
        .collect()
    })
}

// ============================================================================
// AdClassifier
// ============================================================================

/// Classification policy for scanned candidates.
///
/// Implementations decide the selector set the agent queries and
/// whether a returned candidate is an ad. The detector never inspects
/// candidates itself, so swapping the classifier swaps the whole
/// detection policy.
pub trait AdClassifier: Send + Sync {
    /// Returns the CSS selectors the scan should query.
    fn selectors(&self) -> Vec<String>;

    /// Decides whether a scanned candidate is an ad.
    fn is_ad(&self, candidate: &AdCandidate) -> bool;
}

// ============================================================================
// SignatureClassifier
// ============================================================================

/// Default classifier matching known ad-server URLs and markup patterns.
///
/// Iframes qualify only through their source URL; other elements
/// qualify through the definitive selector that matched them or through
/// id/class signatures (`adsbygoogle`, `google_ads_iframe`,
/// `div-gpt-ad`, ad-container class names).
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureClassifier;

impl SignatureClassifier {
    /// Creates the default signature classifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if the URL points at a known ad server.
    #[must_use]
    pub fn matches_ad_server(&self, url: &str) -> bool {
        ad_server_patterns().iter().any(|re| re.is_match(url))
    }

    /// Mirror of the definitive selector list evaluated on the
    /// candidate's own id and class attributes.
    fn matches_markup_signature(&self, candidate: &AdCandidate) -> bool {
        let id = candidate.id.as_str();
        let class = candidate.class_name.as_str();

        match candidate.tag.as_str() {
            "ins" => class.split_whitespace().any(|c| c == "adsbygoogle"),
            "div" => {
                id.starts_with("google_ads_iframe")
                    || id.starts_with("div-gpt-ad")
                    || class.contains("AdContainer")
                    || class.contains("ad-container")
                    || class.contains("advertisement")
            }
            _ => false,
        }
    }
}

impl AdClassifier for SignatureClassifier {
    fn selectors(&self) -> Vec<String> {
        SCAN_SELECTORS.iter().map(|s| (*s).to_string()).collect()
    }

    fn is_ad(&self, candidate: &AdCandidate) -> bool {
        if candidate.tag.eq_ignore_ascii_case("iframe") {
            return self.matches_ad_server(&candidate.src);
        }

        if candidate
            .matched_selector
            .as_deref()
            .is_some_and(|sel| DEFINITIVE_SELECTORS.contains(&sel))
        {
            return true;
        }

        self.matches_markup_signature(candidate)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ElementRect;
    use crate::identifiers::MarkerId;

    fn candidate(tag: &str, id: &str, class: &str, src: &str) -> AdCandidate {
        AdCandidate {
            marker: MarkerId::new("0"),
            tag: tag.to_string(),
            rect: ElementRect {
                x: 0.0,
                y: 0.0,
                width: 300.0,
                height: 250.0,
            },
            viewport_rect: ElementRect {
                x: 0.0,
                y: 0.0,
                width: 300.0,
                height: 250.0,
            },
            src: src.to_string(),
            id: id.to_string(),
            class_name: class.to_string(),
            matched_selector: None,
            in_viewport: true,
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn test_iframe_with_ad_server_src() {
        let classifier = SignatureClassifier::new();
        let c = candidate(
            "iframe",
            "",
            "",
            "https://tpc.googlesyndication.com/safeframe/1",
        );
        assert!(classifier.is_ad(&c));
    }

    #[test]
    fn test_iframe_src_is_case_insensitive() {
        let classifier = SignatureClassifier::new();
        let c = candidate("iframe", "", "", "https://PAGEAD2.GOOGLESYNDICATION.COM/x");
        assert!(classifier.is_ad(&c));
    }

    #[test]
    fn test_iframe_with_benign_src() {
        let classifier = SignatureClassifier::new();
        let c = candidate("iframe", "", "", "https://player.example.com/embed/42");
        assert!(!classifier.is_ad(&c));
    }

    #[test]
    fn test_iframe_with_empty_src() {
        let classifier = SignatureClassifier::new();
        let c = candidate("iframe", "", "", "");
        assert!(!classifier.is_ad(&c));
    }

    #[test]
    fn test_ad_prefix_alternation() {
        let classifier = SignatureClassifier::new();
        assert!(classifier.matches_ad_server("https://ad.doubleclick.net/x"));
        assert!(classifier.matches_ad_server("https://ads.google.com/x"));
        assert!(classifier.matches_ad_server("https://ads.amazon.co.uk/x"));
        assert!(!classifier.matches_ad_server("https://downloads.google.com/x"));
    }

    #[test]
    fn test_adsbygoogle_ins() {
        let classifier = SignatureClassifier::new();
        let c = candidate("ins", "", "adsbygoogle adsbygoogle-noablate", "");
        assert!(classifier.is_ad(&c));
    }

    #[test]
    fn test_adsbygoogle_requires_exact_class() {
        let classifier = SignatureClassifier::new();
        let c = candidate("ins", "", "adsbygoogleish", "");
        assert!(!classifier.is_ad(&c));
    }

    #[test]
    fn test_gpt_div_by_id() {
        let classifier = SignatureClassifier::new();
        assert!(classifier.is_ad(&candidate("div", "div-gpt-ad-1234-0", "", "")));
        assert!(classifier.is_ad(&candidate("div", "google_ads_iframe_1", "", "")));
    }

    #[test]
    fn test_ad_container_class() {
        let classifier = SignatureClassifier::new();
        assert!(classifier.is_ad(&candidate("div", "", "sidebar ad-container large", "")));
        assert!(classifier.is_ad(&candidate("div", "", "AdContainer", "")));
        assert!(classifier.is_ad(&candidate("div", "", "advertisement-slot", "")));
    }

    #[test]
    fn test_plain_div_is_not_ad() {
        let classifier = SignatureClassifier::new();
        let c = candidate("div", "header", "navbar", "");
        assert!(!classifier.is_ad(&c));
    }

    #[test]
    fn test_definitive_matched_selector() {
        let classifier = SignatureClassifier::new();
        let mut c = candidate("div", "slot-3", "widget", "");
        c.matched_selector = Some("div[data-ad-unit]".to_string());
        assert!(classifier.is_ad(&c));
    }

    #[test]
    fn test_scan_only_selector_is_not_definitive() {
        let classifier = SignatureClassifier::new();
        let mut c = candidate("div", "slot-3", "widget", "");
        c.matched_selector = Some("div[aria-label*=\"ad\" i]".to_string());
        assert!(!classifier.is_ad(&c));
    }

    #[test]
    fn test_scan_selectors_cover_definitive_markup() {
        let classifier = SignatureClassifier::new();
        let selectors = classifier.selectors();
        assert!(selectors.iter().any(|s| s == "ins.adsbygoogle"));
        assert!(selectors.iter().any(|s| s.contains("div-gpt-ad")));
        assert_eq!(selectors.len(), SCAN_SELECTORS.len());
    }
}
