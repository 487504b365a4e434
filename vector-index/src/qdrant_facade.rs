//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! Index ↔ collection. Record ids are arbitrary strings while Qdrant only
//! accepts UUID/integer point ids, so each id is mapped through
//! [`stable_uuid`] and the original is kept in the `record_id` payload field.

use std::collections::HashMap;

use futures::future::BoxFuture;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
    FieldType, GetPointsBuilder, HnswConfigDiffBuilder, ListValue, PointId, PointStruct, Struct,
    UpsertPointsBuilder, Value as QValue, VectorParamsBuilder, value,
};
use qdrant_client::{Payload, Qdrant};
use services::uuid::stable_uuid;
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::errors::{IndexError, Result};
use crate::record::{RecordUnit, WriteStatus};
use crate::schema::{DistanceKind, IndexSchema};
use crate::store::VectorStore;

/// Qdrant-backed [`VectorStore`].
pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Builds the client; supports optional API key authentication.
    pub fn new(cfg: &IndexConfig) -> Result<Self> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build().map_err(store_err)?;

        Ok(Self { client })
    }

    async fn point_exists(&self, index: &str, pid: &PointId) -> Result<bool> {
        let res = self
            .client
            .get_points(
                GetPointsBuilder::new(index, vec![pid.clone()])
                    .with_payload(false)
                    .with_vectors(false),
            )
            .await
            .map_err(store_err)?;
        Ok(!res.result.is_empty())
    }
}

fn store_err(e: impl std::fmt::Display) -> IndexError {
    IndexError::Store(e.to_string())
}

fn distance(kind: DistanceKind) -> Distance {
    match kind {
        DistanceKind::Cosine => Distance::Cosine,
        DistanceKind::Dot => Distance::Dot,
        DistanceKind::Euclid => Distance::Euclid,
    }
}

impl VectorStore for QdrantStore {
    fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let exists = self.client.collection_exists(name).await.map_err(store_err)?;
            debug!(index = name, exists, "checked collection");
            Ok(exists)
        })
    }

    fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let v = &schema.vector;
            info!(
                index = %schema.name,
                dimension = v.dimension,
                metric = ?v.metric,
                "creating collection"
            );

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&schema.name)
                        .vectors_config(VectorParamsBuilder::new(
                            v.dimension as u64,
                            distance(v.metric),
                        ))
                        .hnsw_config(
                            HnswConfigDiffBuilder::default()
                                .m(v.method.m)
                                .ef_construct(v.method.ef_construct),
                        ),
                )
                .await
                .map_err(store_err)?;

            // Full-text index over the source text.
            self.client
                .create_field_index(
                    CreateFieldIndexCollectionBuilder::new(
                        &schema.name,
                        &schema.text_field,
                        FieldType::Text,
                    )
                    .wait(true),
                )
                .await
                .map_err(store_err)?;

            info!(index = %schema.name, "collection created");
            Ok(())
        })
    }

    fn upsert<'a>(
        &'a self,
        index: &'a str,
        record: &'a RecordUnit,
    ) -> BoxFuture<'a, Result<WriteStatus>> {
        Box::pin(async move {
            let pid: PointId = stable_uuid(&record.id).to_string().into();
            let existed = self.point_exists(index, &pid).await?;

            let point = PointStruct::new(
                pid,
                record.embedding.clone(),
                Payload::from(record_payload(record)),
            );
            self.client
                .upsert_points(UpsertPointsBuilder::new(index, vec![point]).wait(true))
                .await
                .map_err(store_err)?;

            let status = if existed {
                WriteStatus::Updated
            } else {
                WriteStatus::Created
            };
            debug!(index, id = %record.id, ?status, "upserted point");
            Ok(status)
        })
    }

    fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            let res = self
                .client
                .count(CountPointsBuilder::new(index).exact(true))
                .await
                .map_err(store_err)?;
            Ok(res.result.map(|r| r.count).unwrap_or(0))
        })
    }
}

/// Payload layout: `text`, `record_id`, `metadata{column: value}`.
fn record_payload(record: &RecordUnit) -> HashMap<String, QValue> {
    let metadata = serde_json::Value::Object(
        record
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    );

    let mut payload = HashMap::with_capacity(3);
    payload.insert("text".to_string(), qstring(&record.text));
    payload.insert("record_id".to_string(), qstring(&record.id));
    payload.insert("metadata".to_string(), json_to_qvalue(metadata));
    payload
}

/// Wraps a string into Qdrant `Value`.
fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

/// Converts `serde_json::Value` into Qdrant `Value` (handles arrays/objects).
fn json_to_qvalue(v: serde_json::Value) -> QValue {
    use value::Kind as K;
    let kind = match v {
        serde_json::Value::String(s) => Some(K::StringValue(s)),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(K::IntegerValue(i)),
            (None, Some(f)) => Some(K::DoubleValue(f)),
            _ => Some(K::StringValue(n.to_string())),
        },
        serde_json::Value::Bool(b) => Some(K::BoolValue(b)),
        serde_json::Value::Array(arr) => Some(K::ListValue(ListValue {
            values: arr.into_iter().map(json_to_qvalue).collect(),
        })),
        serde_json::Value::Object(map) => Some(K::StructValue(Struct {
            fields: map.into_iter().map(|(k, v)| (k, json_to_qvalue(v))).collect(),
        })),
        serde_json::Value::Null => None,
    };
    QValue { kind }
}
