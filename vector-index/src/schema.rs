//! Index schema: fixed mapping shared by every index the pipeline creates.

use services::ids;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (the pipeline default).
    Cosine,
    Dot,
    Euclid,
}

/// HNSW graph parameters for approximate nearest-neighbor search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnMethod {
    pub m: u64,
    pub ef_construct: u64,
}

impl Default for AnnMethod {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construct: 100,
        }
    }
}

/// Vector field definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorField {
    pub dimension: usize,
    pub metric: DistanceKind,
    pub method: AnnMethod,
}

/// Declared schema of one vector index.
///
/// - `text_field`: full-text searchable source text
/// - `vector`: fixed-dimension vector with a distance metric
/// - `metadata_field`: schemaless object with the remaining columns
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub vector: VectorField,
    pub text_field: String,
    pub metadata_field: String,
}

impl IndexSchema {
    /// Schema for the file `basename`: name lowercased with `_` → `-`,
    /// cosine distance, default HNSW parameters.
    pub fn for_file(basename: &str, dimension: usize, metric: DistanceKind) -> Self {
        Self {
            name: ids::index_name(basename),
            vector: VectorField {
                dimension,
                metric,
                method: AnnMethod::default(),
            },
            text_field: "text".into(),
            metadata_field: "metadata".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_from_filename() {
        let s = IndexSchema::for_file("Product_Catalog", 1536, DistanceKind::Cosine);
        assert_eq!(s.name, "product-catalog");
        assert_eq!(s.vector.dimension, 1536);
        assert_eq!(s.vector.metric, DistanceKind::Cosine);
        assert_eq!(s.text_field, "text");
        assert_eq!(s.metadata_field, "metadata");
    }
}
