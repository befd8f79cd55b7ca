use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indicator_domain::IndicatorDocument;
use parking_lot::RwLock;

/// Wall clock used to stamp entries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A registered document and where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    /// The document as last registered.
    pub document: IndicatorDocument,

    /// When the document was last registered.
    pub received_at: DateTime<Utc>,

    /// Publisher of the document.
    pub origin: String,
}

type Key = (String, String);

/// Registered documents keyed by `(origin, product name)`.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct Store {
    clock: Clock,
    entries: Arc<RwLock<BTreeMap<Key, RegistryEntry>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Creates an empty store stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// Creates an empty store stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Inserts `document`, replacing any entry from the same origin for the
    /// same product.
    pub fn upsert(&self, document: IndicatorDocument, origin: &str) {
        let key = (origin.to_string(), document.product_name().to_string());
        let entry = RegistryEntry {
            document,
            received_at: (self.clock)(),
            origin: origin.to_string(),
        };

        self.entries.write().insert(key, entry);
    }

    /// Snapshot of all entries, ordered by origin then product name.
    #[must_use]
    pub fn list(&self) -> Vec<RegistryEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Removes entries received before `cutoff`, returning how many were
    /// removed.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.received_at >= cutoff);

        before - entries.len()
    }

    /// Current time according to the store's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;
    use proptest::prelude::*;

    fn document(product: &str, version: &str) -> IndicatorDocument {
        let yaml = format!(
            "apiVersion: indicatorprotocol.io/v1\nspec:\n  product:\n    name: {product}\n    version: \"{version}\"\n  indicators:\n  - name: latency\n    promql: latency\n"
        );
        IndicatorDocument::from_yaml(yaml.as_bytes()).unwrap()
    }

    fn manual_clock() -> (Clock, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let handle = now.clone();
        (Arc::new(move || *handle.lock()), now)
    }

    #[test]
    fn test_upsert_replaces_same_origin_and_product() {
        let store = Store::new();

        store.upsert(document("cf", "1.0"), "metron-agent");
        store.upsert(document("cf", "2.0"), "metron-agent");

        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].document.spec.product.version, "2.0");
    }

    #[test]
    fn test_distinct_origins_are_distinct_entries() {
        let store = Store::new();

        store.upsert(document("cf", "1.0"), "metron-agent");
        store.upsert(document("cf", "1.0"), "metron-agent/cf");

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_is_sorted_by_origin_then_product() {
        let store = Store::new();

        store.upsert(document("zookeeper", "1"), "b");
        store.upsert(document("redis", "1"), "a");
        store.upsert(document("mysql", "1"), "b");

        let keys: Vec<_> = store
            .list()
            .into_iter()
            .map(|e| (e.origin, e.document.spec.product.name))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("a".to_string(), "redis".to_string()),
                ("b".to_string(), "mysql".to_string()),
                ("b".to_string(), "zookeeper".to_string()),
            ]
        );
    }

    #[test]
    fn test_received_at_comes_from_clock() {
        let (clock, now) = manual_clock();
        let store = Store::with_clock(clock);

        store.upsert(document("cf", "1"), "a");
        *now.lock() += Duration::minutes(5);
        store.upsert(document("cf", "2"), "a");

        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();
        assert_eq!(store.list()[0].received_at, expected);
    }

    #[test]
    fn test_evict_older_than() {
        let (clock, now) = manual_clock();
        let store = Store::with_clock(clock);

        store.upsert(document("old", "1"), "a");
        *now.lock() += Duration::minutes(10);
        store.upsert(document("new", "1"), "a");

        let cutoff = *now.lock() - Duration::minutes(5);
        assert_eq!(store.evict_older_than(cutoff), 1);

        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].document.spec.product.name, "new");
    }

    #[test]
    fn test_snapshot_is_detached_from_store() {
        let store = Store::new();
        store.upsert(document("cf", "1"), "a");

        let snapshot = store.list();
        store.upsert(document("uaa", "1"), "a");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    proptest! {
        #[test]
        fn upsert_leaves_exactly_one_entry_per_key(
            writes in prop::collection::vec(("[a-c]", "[p-r]ing", "[0-9]"), 1..20),
        ) {
            let store = Store::new();
            for (origin, product, version) in &writes {
                store.upsert(document(product, version), origin);
            }

            for (origin, product, version) in &writes {
                let last_version = writes
                    .iter()
                    .rev()
                    .find(|(o, p, _)| o == origin && p == product)
                    .map(|(_, _, v)| v);
                let matching: Vec<_> = store
                    .list()
                    .into_iter()
                    .filter(|e| &e.origin == origin && &e.document.spec.product.name == product)
                    .collect();

                prop_assert_eq!(matching.len(), 1);
                prop_assert_eq!(Some(&matching[0].document.spec.product.version), last_version);
                prop_assert_eq!(&matching[0].document, &document(product, last_version.unwrap_or(version)));
            }
        }
    }
}
