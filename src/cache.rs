//! Local order cache.
//!
//! The backend's order listing only carries id/restaurant/total/status, so
//! the client keeps a best-effort shadow of each order it placed (items,
//! delivery details, payment method) and merges it back in at display time.
//! The backend is always authoritative for status.

use crate::services::orders::OrderSummary;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const CACHE_FILE: &str = "orders.json";

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_DELIVERED: &str = "DELIVERED";
pub const STATUS_CANCELLED: &str = "CANCELLED";

/// Placeholder shown when no cached detail exists for a backend order
pub const UNKNOWN_RESTAURANT: &str = "N/A";

/// A line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Structured delivery address and contact details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
}

/// Locally cached shadow of a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedOrder {
    pub order_id: String,
    pub user_identity: String,
    pub restaurant_id: u64,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    pub total_amount: f64,
    pub delivery: DeliveryDetails,
    pub payment_method: String,
    pub items: Vec<OrderItem>,
    pub placed_at: DateTime<Utc>,
    /// Local snapshot only; overwritten by the backend's status on merge
    pub status: String,
}

/// Merged view-model for the order-history view: backend-authoritative
/// fields plus cached detail where available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayOrder {
    pub order_id: String,
    pub restaurant_id: u64,
    pub restaurant_name: String,
    pub total_amount: f64,
    pub status: String,
    pub items: Vec<OrderItem>,
    pub delivery: Option<DeliveryDetails>,
    pub payment_method: Option<String>,
    pub placed_at: Option<DateTime<Utc>>,
}

/// Eviction bounds applied on open and on every put
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub max_entries: usize,
    pub max_age_days: i64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            max_entries: 200,
            max_age_days: 30,
        }
    }
}

/// Durable key-value store of orderId -> CachedOrder.
/// Storage failures degrade to an empty cache; the order-history view then
/// shows backend fields only.
pub struct OrderCache {
    path: PathBuf,
    policy: CachePolicy,
    entries: HashMap<String, CachedOrder>,
}

impl OrderCache {
    pub fn open(state_dir: &Path, policy: CachePolicy) -> Self {
        let path = state_dir.join(CACHE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(err) => {
                    eprintln!("Warning: order cache is corrupt, starting empty: {}", err);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        let mut cache = OrderCache {
            path,
            policy,
            entries,
        };
        if cache.evict() {
            cache.persist();
        }
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, order_id: &str) -> Option<&CachedOrder> {
        self.entries.get(order_id)
    }

    /// Upsert keyed by order id, last-write-wins, persisted synchronously.
    pub fn put(&mut self, order: CachedOrder) {
        self.entries.insert(order.order_id.clone(), order);
        self.evict();
        self.persist();
    }

    /// Overwrite the local status snapshot of a cached order, if present.
    pub fn set_status(&mut self, order_id: &str, status: &str) -> bool {
        match self.entries.get_mut(order_id) {
            Some(order) => {
                order.status = status.to_string();
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Merge authoritative backend summaries with cached detail. Output
    /// ordering follows the backend sequence unchanged; the backend's
    /// status always wins.
    pub fn merge_for_display(&self, backend: &[OrderSummary]) -> Vec<DisplayOrder> {
        backend
            .iter()
            .map(|summary| match self.entries.get(&summary.order_id) {
                Some(cached) => DisplayOrder {
                    order_id: summary.order_id.clone(),
                    restaurant_id: summary.restaurant_id,
                    restaurant_name: cached
                        .restaurant_name
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_RESTAURANT.to_string()),
                    total_amount: summary.total_amount,
                    status: summary.status.clone(),
                    items: cached.items.clone(),
                    delivery: Some(cached.delivery.clone()),
                    payment_method: Some(cached.payment_method.clone()),
                    placed_at: Some(cached.placed_at),
                },
                None => DisplayOrder {
                    order_id: summary.order_id.clone(),
                    restaurant_id: summary.restaurant_id,
                    restaurant_name: UNKNOWN_RESTAURANT.to_string(),
                    total_amount: summary.total_amount,
                    status: summary.status.clone(),
                    items: Vec::new(),
                    delivery: None,
                    payment_method: None,
                    placed_at: None,
                },
            })
            .collect()
    }

    /// Drop entries past the age bound, then the oldest beyond the count
    /// bound. Returns true if anything was removed.
    fn evict(&mut self) -> bool {
        let before = self.entries.len();
        let cutoff = Utc::now() - ChronoDuration::days(self.policy.max_age_days);
        self.entries.retain(|_, order| order.placed_at >= cutoff);

        if self.entries.len() > self.policy.max_entries {
            let mut by_age: Vec<(String, DateTime<Utc>)> = self
                .entries
                .iter()
                .map(|(id, order)| (id.clone(), order.placed_at))
                .collect();
            by_age.sort_by_key(|(_, placed_at)| *placed_at);
            let excess = self.entries.len() - self.policy.max_entries;
            for (id, _) in by_age.into_iter().take(excess) {
                self.entries.remove(&id);
            }
        }
        self.entries.len() != before
    }

    fn persist(&self) {
        let json = match serde_json::to_string_pretty(&self.entries) {
            Ok(j) => j,
            Err(err) => {
                eprintln!("Warning: failed to serialize order cache: {}", err);
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, json) {
            eprintln!("Warning: failed to persist order cache: {}", err);
        }
    }
}

/// Schedule a one-shot, local-only transition of a cached order's status to
/// DELIVERED after `delay`. Never calls the backend. The timer lives only in
/// this process: if it exits first, the transition is lost, and an
/// intervening logout does not cancel it.
pub fn simulate_delayed_delivery(
    state_dir: PathBuf,
    policy: CachePolicy,
    order_id: String,
    delay: Duration,
) -> thread::JoinHandle<bool> {
    thread::spawn(move || {
        thread::sleep(delay);
        let mut cache = OrderCache::open(&state_dir, policy);
        cache.set_status(&order_id, STATUS_DELIVERED)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_order(order_id: &str) -> CachedOrder {
        CachedOrder {
            order_id: order_id.to_string(),
            user_identity: "alice".to_string(),
            restaurant_id: 7,
            restaurant_name: Some("Pizza Place".to_string()),
            total_amount: 20.0,
            delivery: DeliveryDetails {
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
                email: "alice".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62704".to_string(),
                country: "USA".to_string(),
                phone: "9876543210".to_string(),
            },
            payment_method: "Cash on Delivery".to_string(),
            items: vec![OrderItem {
                name: "Pizza".to_string(),
                unit_price: 10.0,
                quantity: 2,
            }],
            placed_at: Utc::now(),
            status: STATUS_PENDING.to_string(),
        }
    }

    fn summary(order_id: &str, status: &str) -> OrderSummary {
        OrderSummary {
            order_id: order_id.to_string(),
            restaurant_id: 7,
            total_amount: 20.0,
            status: status.to_string(),
        }
    }

    #[test]
    fn test_put_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let mut cache = OrderCache::open(dir.path(), CachePolicy::default());
        cache.put(sample_order("O1"));

        let reopened = OrderCache::open(dir.path(), CachePolicy::default());
        assert_eq!(reopened.len(), 1);
        let order = reopened.get("O1").unwrap();
        assert_eq!(order.restaurant_name.as_deref(), Some("Pizza Place"));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.status, STATUS_PENDING);
    }

    #[test]
    fn test_put_is_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let mut cache = OrderCache::open(dir.path(), CachePolicy::default());
        cache.put(sample_order("O1"));

        let mut updated = sample_order("O1");
        updated.total_amount = 35.0;
        cache.put(updated);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("O1").unwrap().total_amount, 35.0);
    }

    #[test]
    fn test_merge_backend_status_wins_detail_from_cache() {
        let dir = TempDir::new().unwrap();
        let mut cache = OrderCache::open(dir.path(), CachePolicy::default());
        cache.put(sample_order("O1"));

        let merged = cache.merge_for_display(&[summary("O1", STATUS_DELIVERED)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, STATUS_DELIVERED);
        assert_eq!(merged[0].restaurant_name, "Pizza Place");
        assert_eq!(merged[0].items, sample_order("O1").items);
        assert_eq!(merged[0].payment_method.as_deref(), Some("Cash on Delivery"));
        assert_eq!(merged[0].delivery.as_ref().unwrap().city, "Springfield");
    }

    #[test]
    fn test_merge_uncached_order_gets_placeholders() {
        let dir = TempDir::new().unwrap();
        let cache = OrderCache::open(dir.path(), CachePolicy::default());

        let merged = cache.merge_for_display(&[summary("O9", STATUS_PENDING)]);
        assert_eq!(merged[0].restaurant_name, UNKNOWN_RESTAURANT);
        assert!(merged[0].items.is_empty());
        assert!(merged[0].delivery.is_none());
        assert!(merged[0].payment_method.is_none());
        assert_eq!(merged[0].total_amount, 20.0);
    }

    #[test]
    fn test_merge_preserves_backend_ordering_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut cache = OrderCache::open(dir.path(), CachePolicy::default());
        cache.put(sample_order("O2"));

        let backend = vec![
            summary("O3", STATUS_PENDING),
            summary("O2", STATUS_DELIVERED),
            summary("O1", STATUS_CANCELLED),
        ];
        let first = cache.merge_for_display(&backend);
        let second = cache.merge_for_display(&backend);

        let ids: Vec<&str> = first.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["O3", "O2", "O1"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_cache_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CACHE_FILE), "{not json").unwrap();

        let cache = OrderCache::open(dir.path(), CachePolicy::default());
        assert!(cache.is_empty());
        let merged = cache.merge_for_display(&[summary("O1", STATUS_PENDING)]);
        assert_eq!(merged[0].restaurant_name, UNKNOWN_RESTAURANT);
    }

    #[test]
    fn test_eviction_caps_entry_count_oldest_first() {
        let dir = TempDir::new().unwrap();
        let policy = CachePolicy {
            max_entries: 2,
            max_age_days: 30,
        };
        let mut cache = OrderCache::open(dir.path(), policy);

        let mut oldest = sample_order("old");
        oldest.placed_at = Utc::now() - ChronoDuration::days(3);
        let mut middle = sample_order("mid");
        middle.placed_at = Utc::now() - ChronoDuration::days(2);
        cache.put(oldest);
        cache.put(middle);
        cache.put(sample_order("new"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("old").is_none());
        assert!(cache.get("mid").is_some());
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn test_eviction_drops_expired_entries_on_open() {
        let dir = TempDir::new().unwrap();
        let policy = CachePolicy {
            max_entries: 200,
            max_age_days: 7,
        };
        // Seed the file directly so the stale entry is present on disk.
        let mut stale = sample_order("stale");
        stale.placed_at = Utc::now() - ChronoDuration::days(30);
        let mut entries = HashMap::new();
        entries.insert("stale".to_string(), stale);
        entries.insert("fresh".to_string(), sample_order("fresh"));
        fs::write(
            dir.path().join(CACHE_FILE),
            serde_json::to_string(&entries).unwrap(),
        )
        .unwrap();

        let reopened = OrderCache::open(dir.path(), policy);
        assert!(reopened.get("stale").is_none());
        assert!(reopened.get("fresh").is_some());
    }

    #[test]
    fn test_set_status_unknown_order_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut cache = OrderCache::open(dir.path(), CachePolicy::default());
        assert!(!cache.set_status("missing", STATUS_DELIVERED));
    }

    #[test]
    fn test_simulate_delayed_delivery_transitions_status() {
        let dir = TempDir::new().unwrap();
        let policy = CachePolicy::default();
        {
            let mut cache = OrderCache::open(dir.path(), policy);
            cache.put(sample_order("O1"));
        }

        let handle = simulate_delayed_delivery(
            dir.path().to_path_buf(),
            policy,
            "O1".to_string(),
            Duration::from_millis(10),
        );
        assert!(handle.join().unwrap());

        let cache = OrderCache::open(dir.path(), policy);
        assert_eq!(cache.get("O1").unwrap().status, STATUS_DELIVERED);
    }

    #[test]
    fn test_simulate_delayed_delivery_for_unknown_order() {
        let dir = TempDir::new().unwrap();
        let handle = simulate_delayed_delivery(
            dir.path().to_path_buf(),
            CachePolicy::default(),
            "nope".to_string(),
            Duration::from_millis(1),
        );
        assert!(!handle.join().unwrap());
    }
}
