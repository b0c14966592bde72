use std::sync::Arc;

use async_trait::async_trait;
use docdelta_types::{DocumentId, OperatorDocument};
use serde_json::Value;

use crate::error::StoreResult;

/// Document persistence backend.
///
/// Implementations must satisfy these invariants:
/// - A failed call leaves the stored document exactly as it was.
/// - `update_by_id` applies every operator of the document or none of them.
/// - Success is reported only once the write is durable for the backend's
///   own definition of durable; callers resynchronize on `Ok` alone.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Insert a new document. The document carries its own `_id`.
    ///
    /// Fails if a document with the same identity already exists.
    async fn insert_new(&self, document: &Value) -> StoreResult<()>;

    /// Apply an operator document to the document identified by `id`.
    async fn update_by_id(&self, id: &DocumentId, update: &OperatorDocument) -> StoreResult<()>;
}

#[async_trait]
impl<B: DocumentBackend + ?Sized> DocumentBackend for Arc<B> {
    async fn insert_new(&self, document: &Value) -> StoreResult<()> {
        (**self).insert_new(document).await
    }

    async fn update_by_id(&self, id: &DocumentId, update: &OperatorDocument) -> StoreResult<()> {
        (**self).update_by_id(id, update).await
    }
}
