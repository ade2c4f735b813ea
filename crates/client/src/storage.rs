//! `localStorage` emulation.
//!
//! A [`StorageBackend`] is one origin's storage shared by every tab; each
//! [`LocalStorage`] handle is one tab. Operations are synchronous and totally
//! ordered by the backend lock. A write that changes a value delivers a
//! [`StorageEvent`] to listeners of every *other* tab before it returns; the
//! writing tab is never notified of its own writes.
//!
//! Same-tab notifications go through [`PageEvent`]s instead, the equivalent of
//! a `CustomEvent` dispatched on `window`: every listener registered through
//! any handle of the dispatching tab sees it, and no other tab does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from storage writes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing file could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file is not a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A change made by another tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
}

/// A named event delivered to listeners of the dispatching tab.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    pub name: String,
    pub detail: Value,
}

impl PageEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, detail: Value) -> Self {
        Self {
            name: name.into(),
            detail,
        }
    }
}

/// Handle returned by [`LocalStorage::add_listener`] and
/// [`LocalStorage::add_page_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Arc<dyn Fn(&StorageEvent) + Send + Sync>;
type PageCallback = Arc<dyn Fn(&PageEvent) + Send + Sync>;

struct Listener<C> {
    id: ListenerId,
    tab: u64,
    callback: C,
}

#[derive(Default)]
struct Backend {
    items: BTreeMap<String, String>,
    listeners: Vec<Listener<Callback>>,
    page_listeners: Vec<Listener<PageCallback>>,
    next_tab: u64,
    next_listener: u64,
    file: Option<PathBuf>,
}

impl Backend {
    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&self.items)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn callbacks_for_others(&self, tab: u64) -> Vec<Callback> {
        self.listeners
            .iter()
            .filter(|l| l.tab != tab)
            .map(|l| Arc::clone(&l.callback))
            .collect()
    }

    fn page_callbacks_for(&self, tab: u64) -> Vec<PageCallback> {
        self.page_listeners
            .iter()
            .filter(|l| l.tab == tab)
            .map(|l| Arc::clone(&l.callback))
            .collect()
    }

    fn listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }
}

/// Storage shared by all tabs of one origin.
#[derive(Clone, Default)]
pub struct StorageBackend {
    inner: Arc<Mutex<Backend>>,
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = self.lock();
        f.debug_struct("StorageBackend")
            .field("items", &backend.items.len())
            .field("listeners", &backend.listeners.len())
            .field("page_listeners", &backend.page_listeners.len())
            .field("file", &backend.file)
            .finish()
    }
}

impl StorageBackend {
    /// Storage that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Storage mirrored to a JSON file, loaded now if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn persistent(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), items = items.len(), "Loaded local storage");

        Ok(Self {
            inner: Arc::new(Mutex::new(Backend {
                items,
                file: Some(path),
                ..Backend::default()
            })),
        })
    }

    /// Open a new tab onto this storage.
    #[must_use]
    pub fn open_tab(&self) -> LocalStorage {
        let tab = {
            let mut backend = self.lock();
            backend.next_tab += 1;
            backend.next_tab
        };
        LocalStorage {
            backend: self.clone(),
            tab,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One tab's view of the shared storage.
#[derive(Clone)]
pub struct LocalStorage {
    backend: StorageBackend,
    tab: u64,
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage").field("tab", &self.tab).finish()
    }
}

impl LocalStorage {
    /// A single tab over fresh in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        StorageBackend::in_memory().open_tab()
    }

    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.backend.lock().items.get(key).cloned()
    }

    /// Store `value` under `key`.
    ///
    /// Writing the value a key already holds is a no-op and notifies no one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written; the value is
    /// then left unchanged.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let (old_value, callbacks) = {
            let mut backend = self.backend.lock();
            let old_value = backend.items.insert(key.to_owned(), value.to_owned());
            if old_value.as_deref() == Some(value) {
                return Ok(());
            }
            if let Err(e) = backend.persist() {
                restore(&mut backend.items, key, old_value);
                return Err(e);
            }
            (old_value, backend.callbacks_for_others(self.tab))
        };

        notify(
            &callbacks,
            &StorageEvent {
                key: key.to_owned(),
                old_value,
                new_value: Some(value.to_owned()),
            },
        );
        Ok(())
    }

    /// Remove `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let (old_value, callbacks) = {
            let mut backend = self.backend.lock();
            let Some(old_value) = backend.items.remove(key) else {
                return Ok(());
            };
            if let Err(e) = backend.persist() {
                backend.items.insert(key.to_owned(), old_value);
                return Err(e);
            }
            (old_value, backend.callbacks_for_others(self.tab))
        };

        notify(
            &callbacks,
            &StorageEvent {
                key: key.to_owned(),
                old_value: Some(old_value),
                new_value: None,
            },
        );
        Ok(())
    }

    /// Listen for changes made by other tabs.
    pub fn add_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let mut backend = self.backend.lock();
        let id = backend.listener_id();
        backend.listeners.push(Listener {
            id,
            tab: self.tab,
            callback: Arc::new(callback),
        });
        id
    }

    /// Listen for [`PageEvent`]s dispatched by any handle of this tab.
    pub fn add_page_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&PageEvent) + Send + Sync + 'static,
    {
        let mut backend = self.backend.lock();
        let id = backend.listener_id();
        backend.page_listeners.push(Listener {
            id,
            tab: self.tab,
            callback: Arc::new(callback),
        });
        id
    }

    /// Deliver `event` to every page listener of this tab, synchronously.
    pub fn dispatch(&self, event: &PageEvent) {
        let callbacks = self.backend.lock().page_callbacks_for(self.tab);
        debug!(name = %event.name, listeners = callbacks.len(), "Dispatching page event");
        for callback in callbacks {
            callback(event);
        }
    }

    /// Remove a storage or page listener. Returns `false` if it was already
    /// removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut backend = self.backend.lock();
        let before = backend.listeners.len() + backend.page_listeners.len();
        backend.listeners.retain(|l| l.id != id);
        backend.page_listeners.retain(|l| l.id != id);
        backend.listeners.len() + backend.page_listeners.len() != before
    }

    /// The storage this tab belongs to.
    #[must_use]
    pub const fn backend(&self) -> &StorageBackend {
        &self.backend
    }
}

fn restore(items: &mut BTreeMap<String, String>, key: &str, old_value: Option<String>) {
    match old_value {
        Some(old) => {
            items.insert(key.to_owned(), old);
        }
        None => {
            items.remove(key);
        }
    }
}

/// Deliver outside the lock so listeners may read storage.
fn notify(callbacks: &[Callback], event: &StorageEvent) {
    if callbacks.is_empty() {
        return;
    }
    debug!(key = %event.key, listeners = callbacks.len(), "Dispatching storage event");
    for callback in callbacks {
        callback(event);
    }
}

/// Log a storage failure that the caller chooses to tolerate.
pub(crate) fn log_write_failure(key: &str, result: Result<(), StorageError>) {
    if let Err(e) = result {
        warn!(key, error = %e, "Local storage write failed");
    }
}
