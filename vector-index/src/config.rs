//! Store connection and writer configuration.

use crate::errors::IndexError;
use crate::schema::DistanceKind;

/// Which backing store the writer talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Qdrant,
    /// Process-local map; nothing survives the process.
    Memory,
}

/// Configuration for index creation and record writes.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub store: StoreKind,
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Vector dimension declared in every created index.
    pub dimension: usize,
    pub distance: DistanceKind,
    /// Upper bound on in-flight upserts.
    pub upsert_concurrency: usize,
}

impl IndexConfig {
    /// Cosine distance, 1536 dimensions, 8 concurrent upserts.
    pub fn new_default(url: impl Into<String>) -> Self {
        Self {
            store: StoreKind::Qdrant,
            qdrant_url: url.into(),
            qdrant_api_key: None,
            dimension: 1536,
            distance: DistanceKind::Cosine,
            upsert_concurrency: 8,
        }
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.store == StoreKind::Qdrant && self.qdrant_url.trim().is_empty() {
            return Err(IndexError::Config("qdrant_url is empty".into()));
        }
        if self.dimension == 0 {
            return Err(IndexError::Config("dimension must be > 0".into()));
        }
        if self.upsert_concurrency == 0 {
            return Err(IndexError::Config("upsert_concurrency must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_and_zero_concurrency_is_not() {
        let mut cfg = IndexConfig::new_default("http://localhost:6334");
        assert!(cfg.validate().is_ok());
        cfg.upsert_concurrency = 0;
        assert!(matches!(cfg.validate(), Err(IndexError::Config(_))));
    }

    #[test]
    fn memory_store_needs_no_url() {
        let mut cfg = IndexConfig::new_default("");
        assert!(cfg.validate().is_err());
        cfg.store = StoreKind::Memory;
        assert!(cfg.validate().is_ok());
    }
}
