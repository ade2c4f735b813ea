//! Dual-store product synchronizer.
//!
//! Local storage is the working copy: reads never wait on the network when it
//! holds a parsable list, and writes land locally before the server is told.
//! The server copy catches up asynchronously, so a failed push leaves local
//! storage ahead of the server until the next successful save.
//!
//! Load resolution order:
//!
//! 1. `products`
//! 2. `products_backup`, repairing `products`
//! 3. the server list
//! 4. the bundled seed set, only before the first successful resolution
//!
//! Every resolution writes through to both local keys.
//!
//! Local saves are announced as a [`PRODUCTS_UPDATED_EVENT`] page event, so
//! every synchronizer on the same tab hears them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use bazaar_core::{Product, ProductId};

use crate::error::SyncError;
use crate::http::ProductRemote;
use crate::storage::{
    ListenerId, LocalStorage, PageEvent, StorageError, StorageEvent, log_write_failure,
};

pub const PRODUCTS_KEY: &str = "products";
pub const PRODUCTS_BACKUP_KEY: &str = "products_backup";
pub const PRODUCTS_INITIALIZED_KEY: &str = "products_initialized";
pub const PRODUCTS_UPDATED_EVENT: &str = "products-updated";

const BUNDLED_SEED: &str = include_str!("seed_products.json");

type UpdateCallback = Arc<dyn Fn(&[Product]) + Send + Sync>;

/// Parse the seed set compiled into the crate.
#[must_use]
pub fn bundled_seed() -> Vec<Product> {
    serde_json::from_str::<Value>(BUNDLED_SEED)
        .ok()
        .and_then(|value| Product::filter_valid_array(value).ok())
        .unwrap_or_else(|| {
            warn!("Bundled product seed is unreadable");
            Vec::new()
        })
}

enum Slot {
    Missing,
    Corrupt,
    Found(Vec<Product>),
}

/// Product catalog for one tab.
pub struct ProductSync<R> {
    storage: LocalStorage,
    remote: R,
    seed: Vec<Product>,
}

impl<R> std::fmt::Debug for ProductSync<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductSync")
            .field("storage", &self.storage)
            .field("seed", &self.seed.len())
            .finish_non_exhaustive()
    }
}

impl<R: ProductRemote> ProductSync<R> {
    /// Synchronizer seeded with the bundled product set.
    #[must_use]
    pub fn new(storage: LocalStorage, remote: R) -> Self {
        Self::with_seed(storage, remote, bundled_seed())
    }

    #[must_use]
    pub fn with_seed(storage: LocalStorage, remote: R, seed: Vec<Product>) -> Self {
        Self {
            storage,
            remote,
            seed,
        }
    }

    /// Resolve the current product list. Never fails; the worst case is an
    /// empty list.
    pub async fn load_products(&self) -> Vec<Product> {
        match self.read(PRODUCTS_KEY) {
            Slot::Found(products) => {
                self.write_through(&products);
                return products;
            }
            Slot::Corrupt => warn!(key = PRODUCTS_KEY, "Stored products are corrupt"),
            Slot::Missing => {}
        }

        match self.read(PRODUCTS_BACKUP_KEY) {
            Slot::Found(products) => {
                info!(count = products.len(), "Repairing products from backup");
                self.write_through(&products);
                return products;
            }
            Slot::Corrupt => warn!(key = PRODUCTS_BACKUP_KEY, "Product backup is corrupt"),
            Slot::Missing => {}
        }

        let initialized = self.storage.get_item(PRODUCTS_INITIALIZED_KEY).is_some();
        match self.remote.fetch_products().await {
            Ok(products) if initialized || !products.is_empty() => {
                debug!(count = products.len(), "Loaded products from server");
                self.write_through(&products);
                return products;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Could not fetch products from server"),
        }

        if initialized {
            return Vec::new();
        }

        info!(count = self.seed.len(), "First run; using bundled products");
        let seed = self.seed.clone();
        self.write_through(&seed);
        seed
    }

    /// Replace the whole list.
    ///
    /// Malformed entries are dropped. Both local keys are written and every
    /// subscriber on this tab notified before the server is contacted.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Invalid`] if `products` is not an array
    /// - [`SyncError::Storage`] if the local write failed
    /// - [`SyncError::Remote`] if the server push failed; the local write
    ///   stands
    pub async fn save_products(&self, products: Value) -> Result<(), SyncError> {
        let products = Product::filter_valid_array(products)?;
        self.store(products).await
    }

    /// Insert `product`, or replace the one with the same id.
    ///
    /// # Errors
    ///
    /// See [`save_products`](Self::save_products).
    pub async fn save_product(&self, product: Product) -> Result<(), SyncError> {
        let mut products = self.load_products().await;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        self.store(products).await
    }

    /// Remove the product with `id`, if present.
    ///
    /// # Errors
    ///
    /// See [`save_products`](Self::save_products).
    pub async fn delete_product(&self, id: ProductId) -> Result<(), SyncError> {
        let mut products = self.load_products().await;
        products.retain(|p| p.id != id);
        self.store(products).await
    }

    /// Call `callback` after every local save made on this tab, by this or any
    /// other synchronizer, and whenever another tab changes `products`.
    ///
    /// The returned guard removes both listeners when dropped.
    pub fn subscribe_to_product_updates<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Product]) + Send + Sync + 'static,
    {
        let callback: UpdateCallback = Arc::new(callback);

        let same_tab = Arc::clone(&callback);
        let page_listener = self.storage.add_page_listener(move |event: &PageEvent| {
            if event.name != PRODUCTS_UPDATED_EVENT {
                return;
            }
            let products = Product::filter_valid_array(event.detail.clone()).unwrap_or_default();
            same_tab(&products);
        });

        let storage_listener = self.storage.add_listener(move |event: &StorageEvent| {
            if event.key != PRODUCTS_KEY {
                return;
            }
            let products = event
                .new_value
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                .and_then(|value| Product::filter_valid_array(value).ok())
                .unwrap_or_default();
            callback(&products);
        });

        Subscription {
            storage: self.storage.clone(),
            page_listener,
            storage_listener,
        }
    }

    async fn store(&self, products: Vec<Product>) -> Result<(), SyncError> {
        let detail = serde_json::to_value(&products).map_err(StorageError::from)?;
        self.write_local(&products)?;
        self.storage.dispatch(&PageEvent::new(PRODUCTS_UPDATED_EVENT, detail));

        if let Err(e) = self.remote.replace_products(&products).await {
            warn!(error = %e, count = products.len(), "Server product sync failed; local copy is ahead");
            return Err(SyncError::Remote(e));
        }
        debug!(count = products.len(), "Products synced");
        Ok(())
    }

    fn read(&self, key: &str) -> Slot {
        let Some(raw) = self.storage.get_item(key) else {
            return Slot::Missing;
        };
        serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|value| Product::filter_valid_array(value).ok())
            .map_or(Slot::Corrupt, Slot::Found)
    }

    fn write_local(&self, products: &[Product]) -> Result<(), StorageError> {
        let json = serde_json::to_string(products)?;
        self.storage.set_item(PRODUCTS_KEY, &json)?;
        self.storage.set_item(PRODUCTS_BACKUP_KEY, &json)?;
        self.storage.set_item(PRODUCTS_INITIALIZED_KEY, "true")
    }

    /// Load paths tolerate write failures; the list is still returned.
    fn write_through(&self, products: &[Product]) {
        log_write_failure(PRODUCTS_KEY, self.write_local(products));
    }
}

/// Guard returned by [`ProductSync::subscribe_to_product_updates`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    storage: LocalStorage,
    page_listener: ListenerId,
    storage_listener: ListenerId,
}

impl Subscription {
    /// Stop receiving updates.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.storage.remove_listener(self.page_listener);
        self.storage.remove_listener(self.storage_listener);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("page_listener", &self.page_listener)
            .field("storage_listener", &self.storage_listener)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::ClientError;
    use crate::storage::StorageBackend;

    #[derive(Default)]
    struct FakeRemote {
        products: Mutex<Vec<Product>>,
        fetch_fails: AtomicBool,
        push_fails: AtomicBool,
        fetches: AtomicUsize,
        pushes: AtomicUsize,
    }

    fn unavailable() -> ClientError {
        ClientError::Api {
            status: 503,
            message: "unavailable".to_owned(),
        }
    }

    impl ProductRemote for Arc<FakeRemote> {
        async fn fetch_products(&self) -> Result<Vec<Product>, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fetch_fails.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            Ok(self.products.lock().unwrap().clone())
        }

        async fn replace_products(&self, products: &[Product]) -> Result<(), ClientError> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            if self.push_fails.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            *self.products.lock().unwrap() = products.to_vec();
            Ok(())
        }
    }

    fn product(id: i64, name: &str) -> Product {
        Product::new(ProductId::new(id), name)
    }

    fn sync_with(
        remote: &Arc<FakeRemote>,
        storage: LocalStorage,
        seed: Vec<Product>,
    ) -> ProductSync<Arc<FakeRemote>> {
        ProductSync::with_seed(storage, Arc::clone(remote), seed)
    }

    #[test]
    fn test_bundled_seed_parses() {
        let seed = bundled_seed();
        assert!(!seed.is_empty());
        assert!(seed.iter().all(|p| p.name().is_some()));
    }

    #[tokio::test]
    async fn test_save_then_load_returns_valid_subset() {
        let remote = Arc::new(FakeRemote::default());
        let sync = sync_with(&remote, LocalStorage::in_memory(), Vec::new());

        sync.save_products(json!([
            {"id": 1, "name": "Mug"},
            {"name": "no id"},
            {"id": 2, "name": 7},
            {"id": 3, "name": null},
        ]))
        .await
        .unwrap();

        let ids: Vec<ProductId> = sync
            .load_products()
            .await
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(3)]);
        assert_eq!(remote.products.lock().unwrap().len(), 2);
        assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_rejects_non_array() {
        let remote = Arc::new(FakeRemote::default());
        let sync = sync_with(&remote, LocalStorage::in_memory(), Vec::new());

        let err = sync.save_products(json!({"id": 1})).await.unwrap_err();
        assert!(matches!(err, SyncError::Invalid(_)));
        assert_eq!(remote.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_corrupt_primary_is_repaired_from_backup() {
        let remote = Arc::new(FakeRemote::default());
        let storage = LocalStorage::in_memory();
        storage.set_item(PRODUCTS_KEY, "{not json").unwrap();
        storage
            .set_item(PRODUCTS_BACKUP_KEY, r#"[{"id":5,"name":"Candle"}]"#)
            .unwrap();
        let sync = sync_with(&remote, storage.clone(), Vec::new());

        let products = sync.load_products().await;
        assert_eq!(products, vec![product(5, "Candle")]);
        assert_eq!(
            storage.get_item(PRODUCTS_KEY),
            storage.get_item(PRODUCTS_BACKUP_KEY)
        );
        assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_miss_falls_back_to_server() {
        let remote = Arc::new(FakeRemote::default());
        remote.products.lock().unwrap().push(product(9, "Tote"));
        let storage = LocalStorage::in_memory();
        let sync = sync_with(&remote, storage.clone(), vec![product(1, "Seed")]);

        assert_eq!(sync.load_products().await, vec![product(9, "Tote")]);
        assert!(storage.get_item(PRODUCTS_BACKUP_KEY).is_some());
        assert!(storage.get_item(PRODUCTS_INITIALIZED_KEY).is_some());
    }

    #[tokio::test]
    async fn test_seed_only_on_first_run() {
        let remote = Arc::new(FakeRemote::default());
        remote.fetch_fails.store(true, Ordering::SeqCst);
        let storage = LocalStorage::in_memory();
        let sync = sync_with(&remote, storage.clone(), vec![product(1, "Seed")]);

        assert_eq!(sync.load_products().await, vec![product(1, "Seed")]);

        // Local copies lost after initialization: no reseed.
        storage.remove_item(PRODUCTS_KEY).unwrap();
        storage.remove_item(PRODUCTS_BACKUP_KEY).unwrap();
        assert!(sync.load_products().await.is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_fires_once_per_save() {
        let remote = Arc::new(FakeRemote::default());
        let sync = sync_with(&remote, LocalStorage::in_memory(), Vec::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let subscription = sync.subscribe_to_product_updates(move |products| {
            assert_eq!(products.len(), 1);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        sync.save_products(json!([{"id": 1, "name": "Mug"}]))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        sync.save_products(json!([{"id": 2, "name": "Towel"}]))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_syncs_on_one_tab_share_updates() {
        let remote = Arc::new(FakeRemote::default());
        let tab = StorageBackend::in_memory().open_tab();
        let ui = sync_with(&remote, tab.clone(), Vec::new());
        let admin = sync_with(&remote, tab, Vec::new());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let _subscription = ui.subscribe_to_product_updates(move |products| {
            assert_eq!(products.to_vec(), vec![product(1, "Mug")]);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        admin
            .save_products(json!([{"id": 1, "name": "Mug"}]))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_odd_typed_records_survive_save_and_load() {
        let remote = Arc::new(FakeRemote::default());
        let storage = LocalStorage::in_memory();
        let sync = sync_with(&remote, storage.clone(), Vec::new());
        let records = json!([
            {"id": 1, "name": "Mug", "stock": "3"},
            {"id": 2, "name": "Tee", "price": "$12.99"},
            {"id": 3, "name": "Cap", "description": 42},
            {"id": "sku-4", "name": "Bag"},
            {"id": 5, "name": "Pen", "price": 12.5}
        ]);

        sync.save_products(records.clone()).await.unwrap();

        let loaded = sync.load_products().await;
        assert_eq!(serde_json::to_value(&loaded).unwrap(), records);
        let stored: Value =
            serde_json::from_str(&storage.get_item(PRODUCTS_KEY).unwrap()).unwrap();
        assert_eq!(stored[4]["price"], json!(12.5));
        assert_eq!(remote.products.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_other_tab_sees_saves() {
        let remote = Arc::new(FakeRemote::default());
        let backend = StorageBackend::in_memory();
        let writer = sync_with(&remote, backend.open_tab(), Vec::new());
        let reader = sync_with(&remote, backend.open_tab(), Vec::new());

        let latest = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&latest);
        let _subscription = reader.subscribe_to_product_updates(move |products| {
            *sink.lock().unwrap() = products.to_vec();
        });

        writer
            .save_products(json!([{"id": 4, "name": "Tote"}]))
            .await
            .unwrap();
        assert_eq!(*latest.lock().unwrap(), vec![product(4, "Tote")]);
    }

    #[tokio::test]
    async fn test_dropped_subscription_ignores_other_tabs() {
        let remote = Arc::new(FakeRemote::default());
        let backend = StorageBackend::in_memory();
        let writer = sync_with(&remote, backend.open_tab(), Vec::new());
        let reader = sync_with(&remote, backend.open_tab(), Vec::new());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        drop(reader.subscribe_to_product_updates(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        writer
            .save_products(json!([{"id": 4, "name": "Tote"}]))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_same_new_id_saved_twice_keeps_last() {
        let remote = Arc::new(FakeRemote::default());
        let sync = sync_with(&remote, LocalStorage::in_memory(), Vec::new());
        sync.save_products(json!([])).await.unwrap();

        sync.save_product(product(7, "First")).await.unwrap();
        sync.save_product(product(7, "Second")).await.unwrap();

        assert_eq!(sync.load_products().await, vec![product(7, "Second")]);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let remote = Arc::new(FakeRemote::default());
        let sync = sync_with(&remote, LocalStorage::in_memory(), Vec::new());
        sync.save_products(json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]))
            .await
            .unwrap();

        sync.delete_product(ProductId::new(1)).await.unwrap();
        assert_eq!(sync.load_products().await, vec![product(2, "B")]);
        assert_eq!(*remote.products.lock().unwrap(), vec![product(2, "B")]);
    }

    #[tokio::test]
    async fn test_local_write_survives_server_failure() {
        let remote = Arc::new(FakeRemote::default());
        remote.push_fails.store(true, Ordering::SeqCst);
        let sync = sync_with(&remote, LocalStorage::in_memory(), Vec::new());

        let err = sync
            .save_products(json!([{"id": 1, "name": "Mug"}]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
        assert_eq!(sync.load_products().await, vec![product(1, "Mug")]);
        assert!(remote.products.lock().unwrap().is_empty());
    }
}
