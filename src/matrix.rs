//! Matrix reconciliation: merge two per-site feature maps into one ordered
//! comparison matrix keyed by `page_feature`.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use crate::types::{FeatureKey, FeatureMap, PageId};

/// One cell pair of the comparison: a (page, feature) identity with each
/// site's independent presence verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixEntry {
    pub page: PageId,
    pub feature: FeatureKey,
    pub site_a: bool,
    pub site_b: bool,
}

impl MatrixEntry {
    /// Synthesized matrix key, `page + "_" + feature`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.page.as_str(), self.feature.as_str())
    }
}

/// The reconciled comparison matrix.
///
/// Entries keep the order in which their keys were first observed: all of
/// site A's (page, feature) pairs in site A's iteration order, then any
/// pairs only site B reported. Every key present in either input appears
/// exactly once; a key absent from one site defaults that site's field to
/// `false`, never omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonMatrix {
    entries: Vec<MatrixEntry>,
}

impl ComparisonMatrix {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in first-observed order.
    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    pub fn get(&self, page: PageId, feature: FeatureKey) -> Option<&MatrixEntry> {
        self.entries
            .iter()
            .find(|e| e.page == page && e.feature == feature)
    }
}

/// Merge two per-site feature maps into one comparison matrix.
///
/// Scans map A first (setting `site_a` per pair, `site_b` defaulting false),
/// then map B (setting `site_b`, creating `site_a = false` entries for pairs
/// A never saw). Each site's boolean is authoritative for its own side only;
/// there is no cross-site override. A page absent from both inputs — both
/// sites failed to load it — contributes no entries at all.
pub fn reconcile(map_a: &FeatureMap, map_b: &FeatureMap) -> ComparisonMatrix {
    let mut entries: Vec<MatrixEntry> = Vec::new();
    let mut index: HashMap<(PageId, FeatureKey), usize> = HashMap::new();

    for (&page, features) in map_a {
        for (&feature, &present) in features {
            let i = upsert(&mut entries, &mut index, page, feature);
            entries[i].site_a = present;
        }
    }

    for (&page, features) in map_b {
        for (&feature, &present) in features {
            let i = upsert(&mut entries, &mut index, page, feature);
            entries[i].site_b = present;
        }
    }

    ComparisonMatrix { entries }
}

/// Create-or-fetch the entry for a (page, feature) pair, returning its index.
/// New entries start all-false on both sides.
fn upsert(
    entries: &mut Vec<MatrixEntry>,
    index: &mut HashMap<(PageId, FeatureKey), usize>,
    page: PageId,
    feature: FeatureKey,
) -> usize {
    *index.entry((page, feature)).or_insert_with(|| {
        entries.push(MatrixEntry {
            page,
            feature,
            site_a: false,
            site_b: false,
        });
        entries.len() - 1
    })
}

// The wire shape is an object keyed `page_feature` in entry order, matching
// the result consumed by the CSV/report renderers and the frontend.
impl Serialize for ComparisonMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key(), entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ComparisonMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MatrixVisitor;

        impl<'de> Visitor<'de> for MatrixVisitor {
            type Value = ComparisonMatrix;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of matrix keys to entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                // Consume pairs in document order so ordering survives a
                // serialize/deserialize round trip.
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_key, entry)) = access.next_entry::<String, MatrixEntry>()? {
                    entries.push(entry);
                }
                Ok(ComparisonMatrix { entries })
            }
        }

        deserializer.deserialize_map(MatrixVisitor)
    }
}

/// Derived summary of a comparison matrix, computed for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixSummary {
    /// Entries where site A reports the feature present.
    pub site_a_count: usize,
    /// Entries where site B reports the feature present.
    pub site_b_count: usize,
    /// Keys where both sites report the feature present.
    pub common: Vec<String>,
    /// Keys where only site A reports the feature.
    pub unique_to_a: Vec<String>,
    /// Keys where only site B reports the feature.
    pub unique_to_b: Vec<String>,
}

impl MatrixSummary {
    pub fn from_matrix(matrix: &ComparisonMatrix) -> Self {
        let mut summary = MatrixSummary {
            site_a_count: 0,
            site_b_count: 0,
            common: Vec::new(),
            unique_to_a: Vec::new(),
            unique_to_b: Vec::new(),
        };
        for entry in matrix.entries() {
            if entry.site_a {
                summary.site_a_count += 1;
            }
            if entry.site_b {
                summary.site_b_count += 1;
            }
            match (entry.site_a, entry.site_b) {
                (true, true) => summary.common.push(entry.key()),
                (true, false) => summary.unique_to_a.push(entry.key()),
                (false, true) => summary.unique_to_b.push(entry.key()),
                (false, false) => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageFeatures;
    use std::collections::BTreeMap;

    fn page(features: &[(FeatureKey, bool)]) -> PageFeatures {
        features.iter().copied().collect()
    }

    fn map(pages: &[(PageId, PageFeatures)]) -> FeatureMap {
        pages.iter().cloned().collect()
    }

    #[test]
    fn reconcile_every_key_appears_exactly_once() {
        let a = map(&[
            (PageId::Home, page(&[(FeatureKey::Cart, true), (FeatureKey::Login, false)])),
            (PageId::Search, page(&[(FeatureKey::Filter, true)])),
        ]);
        let b = map(&[(PageId::Home, page(&[(FeatureKey::Cart, false)]))]);

        let matrix = reconcile(&a, &b);
        assert_eq!(matrix.len(), 3);

        let mut keys: Vec<String> = matrix.entries().iter().map(|e| e.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn reconcile_cross_site_defaults() {
        // siteA saw {home, search} with home.cart=true; siteB saw
        // {home, product} with home.cart=false, product.cart=true.
        let a = map(&[
            (PageId::Home, page(&[(FeatureKey::Cart, true)])),
            (PageId::Search, page(&[(FeatureKey::Filter, true)])),
        ]);
        let b = map(&[
            (PageId::Home, page(&[(FeatureKey::Cart, false)])),
            (PageId::Product, page(&[(FeatureKey::Cart, true)])),
        ]);

        let matrix = reconcile(&a, &b);

        let home_cart = matrix.get(PageId::Home, FeatureKey::Cart).unwrap();
        assert!(home_cart.site_a);
        assert!(!home_cart.site_b);

        let product_cart = matrix.get(PageId::Product, FeatureKey::Cart).unwrap();
        assert!(!product_cart.site_a);
        assert!(product_cart.site_b);

        // search came only from A, product only from B; each field defaults
        // false on the missing side.
        let search_filter = matrix.get(PageId::Search, FeatureKey::Filter).unwrap();
        assert!(search_filter.site_a);
        assert!(!search_filter.site_b);
    }

    #[test]
    fn reconcile_orders_a_pairs_before_b_only_pairs() {
        let a = map(&[(PageId::Search, page(&[(FeatureKey::Sort, true)]))]);
        let b = map(&[
            (PageId::Home, page(&[(FeatureKey::Navigation, true)])),
            (PageId::Search, page(&[(FeatureKey::Sort, true)])),
        ]);

        let matrix = reconcile(&a, &b);
        let keys: Vec<String> = matrix.entries().iter().map(|e| e.key()).collect();
        // A's pair first, then the B-only pair — even though "home" sorts
        // before "search".
        assert_eq!(keys, vec!["search_sort", "home_navigation"]);
    }

    #[test]
    fn reconcile_is_symmetric_in_content() {
        let a = map(&[(PageId::Home, page(&[(FeatureKey::Cart, true), (FeatureKey::Share, false)]))]);
        let b = map(&[(PageId::Product, page(&[(FeatureKey::Review, true)]))]);

        let forward = reconcile(&a, &b);
        let swapped = reconcile(&b, &a);

        let mut forward_set: Vec<(String, bool, bool)> = forward
            .entries()
            .iter()
            .map(|e| (e.key(), e.site_a, e.site_b))
            .collect();
        let mut swapped_set: Vec<(String, bool, bool)> = swapped
            .entries()
            .iter()
            .map(|e| (e.key(), e.site_b, e.site_a))
            .collect();
        forward_set.sort();
        swapped_set.sort();
        assert_eq!(forward_set, swapped_set);
    }

    #[test]
    fn reconcile_with_itself_is_idempotent() {
        let a = map(&[
            (PageId::Home, page(&[(FeatureKey::Cart, true), (FeatureKey::Login, false)])),
            (PageId::Product, page(&[(FeatureKey::Review, true)])),
        ]);
        let matrix = reconcile(&a, &a);
        for entry in matrix.entries() {
            assert_eq!(entry.site_a, entry.site_b, "entry {}", entry.key());
        }
    }

    #[test]
    fn reconcile_page_missing_from_both_inputs() {
        // A page neither site loaded contributes zero keys — silently absent,
        // not represented as all-false rows. Deliberate behavior; changing it
        // is a product decision, not a refactor.
        let a = map(&[(PageId::Home, page(&[(FeatureKey::Cart, true)]))]);
        let b = map(&[(PageId::Home, page(&[(FeatureKey::Cart, true)]))]);

        let matrix = reconcile(&a, &b);
        assert_eq!(matrix.len(), 1);
        assert!(matrix.get(PageId::Search, FeatureKey::Cart).is_none());
        assert!(matrix.get(PageId::Product, FeatureKey::Cart).is_none());
    }

    #[test]
    fn reconcile_empty_inputs() {
        let matrix = reconcile(&FeatureMap::new(), &FeatureMap::new());
        assert!(matrix.is_empty());
    }

    #[test]
    fn matrix_serializes_as_ordered_keyed_object() {
        let a = map(&[(PageId::Search, page(&[(FeatureKey::Sort, true)]))]);
        let b = map(&[(PageId::Home, page(&[(FeatureKey::Cart, true)]))]);
        let matrix = reconcile(&a, &b);

        let json = serde_json::to_string(&matrix).unwrap();
        // Entry order (A first) must survive serialization.
        let search_pos = json.find("search_sort").unwrap();
        let home_pos = json.find("home_cart").unwrap();
        assert!(search_pos < home_pos);

        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["search_sort"]["siteA"], true);
        assert_eq!(v["search_sort"]["siteB"], false);
        assert_eq!(v["home_cart"]["page"], "home");
        assert_eq!(v["home_cart"]["feature"], "cart");

        let back: ComparisonMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matrix);
    }

    #[test]
    fn summary_partitions_entries() {
        let a = map(&[(
            PageId::Home,
            page(&[
                (FeatureKey::Cart, true),
                (FeatureKey::Login, true),
                (FeatureKey::Share, false),
            ]),
        )]);
        let b = map(&[(
            PageId::Home,
            page(&[
                (FeatureKey::Cart, true),
                (FeatureKey::Login, false),
                (FeatureKey::Share, true),
            ]),
        )]);

        let summary = MatrixSummary::from_matrix(&reconcile(&a, &b));
        assert_eq!(summary.site_a_count, 2);
        assert_eq!(summary.site_b_count, 2);
        assert_eq!(summary.common, vec!["home_cart"]);
        assert_eq!(summary.unique_to_a, vec!["home_login"]);
        assert_eq!(summary.unique_to_b, vec!["home_share"]);
    }
}
