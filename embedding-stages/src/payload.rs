//! Stage input/output bodies.

use serde::{Deserialize, Serialize};
use vector_index::{RecordUnit, WriteFailure};

/// Body of a successful `csv-processor` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOutput {
    pub embeddings_data: Vec<RecordUnit>,
    pub csv_filename: String,
    pub total_records: usize,
}

/// Body of a successful `index-writer` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOutput {
    pub message: String,
    pub index_name: String,
    pub indexed_count: usize,
    #[serde(default)]
    pub records_attempted: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<WriteFailure>,
}

impl IndexOutput {
    pub fn new(
        index_name: String,
        indexed_count: usize,
        records_attempted: usize,
        failures: Vec<WriteFailure>,
    ) -> Self {
        Self {
            message: format!("Successfully indexed {indexed_count} records to {index_name}"),
            index_name,
            indexed_count,
            records_attempted,
            failures,
        }
    }
}

/// `index-writer` input: the previous stage's whole response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingEnvelope {
    pub body: EmbeddingOutput,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_output_wire_shape() {
        let out = IndexOutput::new("products".into(), 2, 2, vec![]);
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({
                "message": "Successfully indexed 2 records to products",
                "index_name": "products",
                "indexed_count": 2,
                "records_attempted": 2
            })
        );
    }

    #[test]
    fn embedding_output_reads_records() {
        let v = json!({
            "embeddings_data": [
                {"id": "file_0", "text": "A d1", "embedding": [0.5, 0.5], "metadata": {"price": "9"}}
            ],
            "csv_filename": "file",
            "total_records": 1
        });
        let out: EmbeddingOutput = serde_json::from_value(v).unwrap();
        assert_eq!(out.embeddings_data[0].id, "file_0");
        assert_eq!(out.embeddings_data[0].metadata["price"], "9");
    }
}
