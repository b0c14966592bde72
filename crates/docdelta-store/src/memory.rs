use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use docdelta_types::{DocumentId, OperatorDocument};
use serde_json::Value;
use tracing::{debug, warn};

use crate::apply::apply_update;
use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentBackend;

/// A write accepted by [`InMemoryBackend`], kept for inspection.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteRecord {
    Insert(DocumentId),
    Update(DocumentId, OperatorDocument),
}

/// In-memory, HashMap-based document backend.
///
/// Intended for tests, demos, and embedding. Documents are held behind a
/// `RwLock` so the backend can be shared across tasks. Updates are applied
/// with [`apply_update`], so the stored document reflects exactly what a
/// document database would hold after the same writes.
pub struct InMemoryBackend {
    documents: RwLock<HashMap<DocumentId, Value>>,
    writes: RwLock<Vec<WriteRecord>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            writes: RwLock::new(Vec::new()),
        }
    }

    /// Store a document directly, bypassing the write log.
    ///
    /// Used to set up existing state before a builder loads it.
    pub fn seed(&self, document: Value) -> StoreResult<DocumentId> {
        let id = Self::identity_of(&document)?;
        self.documents
            .write()
            .expect("lock poisoned")
            .insert(id, document);
        Ok(id)
    }

    /// A copy of the stored document, if present.
    pub fn get(&self, id: &DocumentId) -> Option<Value> {
        self.documents.read().expect("lock poisoned").get(id).cloned()
    }

    /// Returns `true` if a document with this identity is stored.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.read().expect("lock poisoned").contains_key(id)
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the backend holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.read().expect("lock poisoned").is_empty()
    }

    /// Every accepted write, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.read().expect("lock poisoned").clone()
    }

    /// Remove all documents and forget the write log.
    pub fn clear(&self) {
        self.documents.write().expect("lock poisoned").clear();
        self.writes.write().expect("lock poisoned").clear();
    }

    fn identity_of(document: &Value) -> StoreResult<DocumentId> {
        if !document.is_object() {
            return Err(StoreError::InvalidDocument(
                "document root must be an object".into(),
            ));
        }
        DocumentId::from_document(document)?.ok_or(StoreError::MissingId)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    async fn insert_new(&self, document: &Value) -> StoreResult<()> {
        let id = Self::identity_of(document)?;
        {
            let mut documents = self.documents.write().expect("lock poisoned");
            if documents.contains_key(&id) {
                warn!(%id, "insert rejected: document already exists");
                return Err(StoreError::AlreadyExists(id));
            }
            documents.insert(id, document.clone());
        }
        self.writes
            .write()
            .expect("lock poisoned")
            .push(WriteRecord::Insert(id));
        debug!(%id, "inserted document");
        Ok(())
    }

    async fn update_by_id(&self, id: &DocumentId, update: &OperatorDocument) -> StoreResult<()> {
        {
            let mut documents = self.documents.write().expect("lock poisoned");
            let stored = documents.get_mut(id).ok_or(StoreError::NotFound(*id))?;
            if let Err(e) = apply_update(stored, update) {
                warn!(%id, error = %e, "update rejected");
                return Err(e);
            }
        }
        self.writes
            .write()
            .expect("lock poisoned")
            .push(WriteRecord::Update(*id, update.clone()));
        debug!(%id, entries = update.len(), "applied update");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("document_count", &self.len())
            .finish()
    }
}
