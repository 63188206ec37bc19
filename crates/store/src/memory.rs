use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use credentials::CredentialBundle;

use crate::vector::parse_vector_literal;
use crate::{DocumentConnection, DocumentStore, InsertedDocument, StoreError};

/// A row held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    /// Literal exactly as it was bound.
    pub vector_literal: String,
    pub embedding: Vec<f32>,
}

#[derive(Default)]
struct MemoryInner {
    rows: Mutex<Vec<StoredDocument>>,
    next_id: AtomicU64,
    connects: AtomicUsize,
    inserts: AtomicUsize,
    closes: AtomicUsize,
    connect_failure: Mutex<Option<StoreError>>,
    insert_failure: Mutex<Option<StoreError>>,
}

/// In-process document table with serial ids.
///
/// Literals are parsed the way the `vector` type would parse them, so a bad
/// literal fails here too. Also counts connects/inserts/closes, which makes it
/// the store of choice for exercising the orchestrator.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `connect` fails with `err`.
    pub fn fail_connects_with(&self, err: StoreError) -> Result<(), StoreError> {
        *self
            .inner
            .connect_failure
            .lock()
            .map_err(|_| StoreError::poisoned())? = Some(err);
        Ok(())
    }

    /// Every subsequent `insert` fails with `err`.
    pub fn fail_inserts_with(&self, err: StoreError) -> Result<(), StoreError> {
        *self
            .inner
            .insert_failure
            .lock()
            .map_err(|_| StoreError::poisoned())? = Some(err);
        Ok(())
    }

    pub fn rows(&self) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .inner
            .rows
            .lock()
            .map_err(|_| StoreError::poisoned())?
            .clone())
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.inner.inserts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn connect(
        &self,
        _credentials: &CredentialBundle,
    ) -> Result<Box<dyn DocumentConnection>, StoreError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .inner
            .connect_failure
            .lock()
            .map_err(|_| StoreError::poisoned())?
            .clone()
        {
            return Err(err);
        }
        Ok(Box::new(MemoryConnection {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryConnection {
    inner: Arc<MemoryInner>,
}

#[async_trait]
impl DocumentConnection for MemoryConnection {
    async fn insert(
        &mut self,
        content: &str,
        vector_literal: &str,
    ) -> Result<InsertedDocument, StoreError> {
        self.inner.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .inner
            .insert_failure
            .lock()
            .map_err(|_| StoreError::poisoned())?
            .clone()
        {
            return Err(err);
        }

        let embedding = parse_vector_literal(vector_literal)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let id = (self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        self.inner
            .rows
            .lock()
            .map_err(|_| StoreError::poisoned())?
            .push(StoredDocument {
                id: id.clone(),
                content: content.to_string(),
                vector_literal: vector_literal.to_string(),
                embedding,
            });
        Ok(InsertedDocument { id })
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
