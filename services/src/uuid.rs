use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
///
/// Vector stores that only accept UUID/integer keys get a stable key for
/// textual record ids, so re-ingesting the same row overwrites the same point.
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}
