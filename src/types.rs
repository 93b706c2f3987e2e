//! Core data model: fixed page paths, the feature taxonomy, per-site feature
//! maps, and the analysis result handed to presentation layers.
//!
//! Both `PageId` and `FeatureKey` are closed sets. Their declaration order is
//! meaningful: derived `Ord` gives walk order for pages and taxonomy order
//! for features, so `BTreeMap` iteration is deterministic everywhere the
//! reconciler and exporters consume these maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matrix::ComparisonMatrix;

/// One of the fixed page paths visited on every site.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PageId {
    Home,
    Search,
    Product,
}

impl PageId {
    /// Wire/matrix-key name, identical to the JSON field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageId::Home => "home",
            PageId::Search => "search",
            PageId::Product => "product",
        }
    }

    /// Relative URL suffix appended to a site's base URL.
    pub fn path(&self) -> &'static str {
        match self {
            PageId::Home => "/",
            PageId::Search => "/search",
            PageId::Product => "/product",
        }
    }

    /// Human-readable name used in exports.
    pub fn display_name(&self) -> &'static str {
        match self {
            PageId::Home => "Homepage",
            PageId::Search => "Search Page",
            PageId::Product => "Product Page",
        }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed ordered walk list. Order determines walk and display order.
pub const PAGE_PATHS: [PageId; 3] = [PageId::Home, PageId::Search, PageId::Product];

/// One of the ten fixed UI capabilities the detector probes for.
///
/// Extending the taxonomy means adding a variant here and a rule in
/// [`crate::detector::RULES`]; nothing in the walker or reconciler changes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    SearchBar,
    Filter,
    Sort,
    Favorite,
    Cart,
    Login,
    Navigation,
    Pagination,
    Share,
    Review,
}

impl FeatureKey {
    /// All features in taxonomy order.
    pub const ALL: [FeatureKey; 10] = [
        FeatureKey::SearchBar,
        FeatureKey::Filter,
        FeatureKey::Sort,
        FeatureKey::Favorite,
        FeatureKey::Cart,
        FeatureKey::Login,
        FeatureKey::Navigation,
        FeatureKey::Pagination,
        FeatureKey::Share,
        FeatureKey::Review,
    ];

    /// Wire/matrix-key name, identical to the JSON field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::SearchBar => "searchBar",
            FeatureKey::Filter => "filter",
            FeatureKey::Sort => "sort",
            FeatureKey::Favorite => "favorite",
            FeatureKey::Cart => "cart",
            FeatureKey::Login => "login",
            FeatureKey::Navigation => "navigation",
            FeatureKey::Pagination => "pagination",
            FeatureKey::Share => "share",
            FeatureKey::Review => "review",
        }
    }

    /// Human-readable name used in exports.
    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureKey::SearchBar => "Search Function",
            FeatureKey::Filter => "Filter Function",
            FeatureKey::Sort => "Sort Function",
            FeatureKey::Favorite => "Wishlist/Like",
            FeatureKey::Cart => "Shopping Cart",
            FeatureKey::Login => "Login/Register",
            FeatureKey::Navigation => "Menu/Navigation",
            FeatureKey::Pagination => "Pagination",
            FeatureKey::Share => "Share Function",
            FeatureKey::Review => "Review/Rating",
        }
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature presence for a single rendered page.
pub type PageFeatures = BTreeMap<FeatureKey, bool>;

/// Per-site map: page → feature → presence. Pages that failed to load are
/// absent entirely, never present with zeroed features.
pub type FeatureMap = BTreeMap<PageId, PageFeatures>;

/// Everything captured for one site during a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteAnalysis {
    /// Normalized base URL the walk started from.
    pub url: String,
    /// Page → stored screenshot reference (`/screenshots/<file>`).
    pub screenshots: BTreeMap<PageId, String>,
    /// Page → detected features. Same shape for both sites.
    pub features: FeatureMap,
}

/// The completed result of one analysis job. Immutable once the job reaches
/// a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub site_a: SiteAnalysis,
    pub site_b: SiteAnalysis,
    pub feature_matrix: ComparisonMatrix,
}
