//! Structural feature detection.
//!
//! Each feature is the logical OR over a small fixed list of CSS-selector
//! predicates, evaluated inside the rendered page. Predicates are pure
//! existence checks — element matches, attribute substrings, accessibility
//! labels in either English or Korean — never value checks. A `<select>`
//! used for something unrelated to filtering still counts as "filter"; that
//! false-positive risk is inherent to the heuristic.
//!
//! The taxonomy is a declarative table: adding a feature means adding a
//! [`FeatureKey`] variant and one [`DetectionRule`] here. The walker and the
//! reconciler never change.

use crate::error::PageError;
use crate::renderer::PageHandle;
use crate::types::{FeatureKey, PageFeatures};

/// One feature's detection predicates. The feature is present when any
/// selector matches at least one element.
pub struct DetectionRule {
    pub feature: FeatureKey,
    pub selectors: &'static [&'static str],
}

/// The full rule table, one rule per taxonomy entry, in taxonomy order.
pub const RULES: [DetectionRule; 10] = [
    DetectionRule {
        feature: FeatureKey::SearchBar,
        selectors: &[
            "input[type=\"search\"]",
            "input[placeholder*=\"검색\"]",
            "input[placeholder*=\"search\"]",
            "[aria-label*=\"검색\"]",
            "[aria-label*=\"search\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Filter,
        selectors: &[
            ".filter",
            "[data-filter]",
            "select",
            "[role=\"listbox\"]",
            "[aria-label*=\"필터\"]",
            "[aria-label*=\"filter\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Sort,
        selectors: &[
            ".sort",
            "[data-sort]",
            "[aria-label*=\"정렬\"]",
            "[aria-label*=\"sort\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Favorite,
        selectors: &[
            "[class*=\"wish\"]",
            "[class*=\"like\"]",
            "[class*=\"favorite\"]",
            "[aria-label*=\"찜\"]",
            "[aria-label*=\"좋아요\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Cart,
        selectors: &[
            "[class*=\"cart\"]",
            "[class*=\"basket\"]",
            "[aria-label*=\"장바구니\"]",
            "[aria-label*=\"cart\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Login,
        selectors: &[
            "[href*=\"login\"]",
            "[href*=\"signin\"]",
            "[class*=\"login\"]",
            "[class*=\"signin\"]",
            "[aria-label*=\"로그인\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Navigation,
        selectors: &["nav", "[role=\"navigation\"]", ".menu", ".nav", "#menu", "#nav"],
    },
    DetectionRule {
        feature: FeatureKey::Pagination,
        selectors: &[
            ".pagination",
            "[aria-label*=\"페이지\"]",
            "[role=\"navigation\"][aria-label*=\"페이지\"]",
            "ul.pages",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Share,
        selectors: &[
            "[class*=\"share\"]",
            "[aria-label*=\"공유\"]",
            "[aria-label*=\"share\"]",
        ],
    },
    DetectionRule {
        feature: FeatureKey::Review,
        selectors: &[
            "[class*=\"review\"]",
            "[class*=\"rating\"]",
            "[aria-label*=\"리뷰\"]",
            "[aria-label*=\"평점\"]",
        ],
    },
];

/// Build the in-page probe script from the rule table.
///
/// Produces an IIFE returning `{ "<feature>": bool, ... }` with one entry per
/// rule. Selector lists are JSON-encoded so quoting survives the trip into a
/// JS string literal.
pub fn probe_script() -> String {
    let mut script = String::from("(() => { return {");
    for (i, rule) in RULES.iter().enumerate() {
        if i > 0 {
            script.push(',');
        }
        // &[&str] serializes to a JS array literal of selector strings.
        let selectors =
            serde_json::to_string(rule.selectors).expect("static selector list serializes");
        script.push_str(&format!(
            "\n  \"{}\": {}.some((s) => document.querySelector(s) !== null)",
            rule.feature.as_str(),
            selectors
        ));
    }
    script.push_str("\n}; })()");
    script
}

/// Run the probe battery against a rendered page.
///
/// Pure with respect to the page: no side effects, a function of the DOM at
/// call time. If the probe cannot run or returns an incomplete mapping this
/// fails with [`PageError::Detection`] rather than reporting a partial or
/// zeroed map.
pub async fn detect(page: &dyn PageHandle) -> Result<PageFeatures, PageError> {
    let value = page.evaluate(&probe_script()).await?;

    let obj = value
        .as_object()
        .ok_or_else(|| PageError::Detection(format!("probe returned non-object: {value}")))?;

    let mut features = PageFeatures::new();
    for key in FeatureKey::ALL {
        let present = obj
            .get(key.as_str())
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                PageError::Detection(format!("probe result missing '{}'", key.as_str()))
            })?;
        features.insert(key, present);
    }
    Ok(features)
}
