//! Product file commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli products import catalog.json
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_PRODUCTS_FILE` - destination (default `data/products.json`)

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use bazaar_storefront::products::{ProductFileStore, ProductStoreError};

/// Errors that can occur while importing products.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] ProductStoreError),
}

fn destination(to: Option<PathBuf>) -> PathBuf {
    to.unwrap_or_else(|| {
        dotenvy::dotenv().ok();
        std::env::var("STOREFRONT_PRODUCTS_FILE")
            .map_or_else(|_| PathBuf::from("data/products.json"), PathBuf::from)
    })
}

/// Validate `file` and replace the server product file with its valid entries.
///
/// # Returns
///
/// How many products were written.
///
/// # Errors
///
/// Fails if `file` is unreadable, not JSON, or not an array.
pub async fn import(file: &Path, to: Option<PathBuf>) -> Result<usize, ImportError> {
    let raw = tokio::fs::read(file).await.map_err(|source| ImportError::Read {
        path: file.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_slice(&raw).map_err(|source| ImportError::Parse {
        path: file.to_path_buf(),
        source,
    })?;

    let store = ProductFileStore::new(destination(to));
    let products = store.replace_all(payload).await?;

    tracing::info!(
        count = products.len(),
        path = %store.path().display(),
        "Product file replaced"
    );
    Ok(products.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_import_filters_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("catalog.json");
        std::fs::write(
            &source,
            r#"[{"id": 1, "name": "Mug"}, {"name": "missing id"}]"#,
        )
        .unwrap();
        let target = dir.path().join("data/products.json");

        let count = import(&source, Some(target.clone())).await.unwrap();
        assert_eq!(count, 1);

        let written = ProductFileStore::new(target).load().await.unwrap();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn test_import_rejects_object() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("catalog.json");
        std::fs::write(&source, r#"{"id": 1}"#).unwrap();

        let err = import(&source, Some(dir.path().join("out.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Store(ProductStoreError::Invalid(_))));
    }
}
