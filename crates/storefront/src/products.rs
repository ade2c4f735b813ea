//! Server-side product file.
//!
//! The canonical product list is a single JSON array on disk, read and
//! written wholesale. Writes go to a sibling temp file that is then renamed
//! over the original, so readers never observe a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use bazaar_core::{Product, ProductError};

/// Errors from the product file.
#[derive(Debug, Error)]
pub enum ProductStoreError {
    /// Filesystem error.
    #[error("product file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not valid JSON.
    #[error("product file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Payload or file contents are not a JSON array.
    #[error("{0}")]
    Invalid(#[from] ProductError),
}

/// JSON-file product store with serialized writes.
#[derive(Debug)]
pub struct ProductFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProductFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid product in the file.
    ///
    /// A missing file is an empty catalog. Malformed entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array.
    pub async fn load(&self) -> Result<Vec<Product>, ProductStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Product file missing; returning empty list");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let value: Value = serde_json::from_slice(&bytes)?;
        let entries = match &value {
            Value::Array(entries) => entries.len(),
            _ => 0,
        };
        let products = Product::filter_valid_array(value)?;
        if products.len() < entries {
            warn!(
                path = %self.path.display(),
                dropped = entries - products.len(),
                "Skipped malformed product entries"
            );
        }
        Ok(products)
    }

    /// Replace the whole catalog with the valid entries of `payload`.
    ///
    /// Returns the products actually written.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if `payload` is not an array, or an I/O error.
    pub async fn replace_all(&self, payload: Value) -> Result<Vec<Product>, ProductStoreError> {
        let products = Product::filter_valid_array(payload)?;
        self.write(&products).await?;
        Ok(products)
    }

    /// Write already-validated products.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    pub async fn write(&self, products: &[Product]) -> Result<(), ProductStoreError> {
        let json = serde_json::to_vec_pretty(products)?;

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(path = %self.path.display(), count = products.len(), "Product file written");
        Ok(())
    }
}
