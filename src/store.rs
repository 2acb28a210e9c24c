//! Registry of open documents with one lock per document.
//!
//! The registry lock is held only long enough to look a document up, so
//! edits to different documents run in parallel while edits to the same
//! document are serialized.

use crate::document::Document;
use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Open documents keyed by caller-chosen names (upload ids, paths, ...)
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Mutex<HashMap<String, Arc<Mutex<Document>>>>,
}

impl DocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, replacing any previous one under `key`
    pub fn insert(&self, key: impl Into<String>, document: Document) {
        let key = key.into();
        debug!("Registering document '{}'", key);
        self.registry()
            .insert(key, Arc::new(Mutex::new(document)));
    }

    /// Open a file and register it under `key`
    pub fn open<P: AsRef<Path>>(&self, key: impl Into<String>, path: P) -> Result<()> {
        let document = Document::open(path)?;
        self.insert(key, document);
        Ok(())
    }

    /// Run `f` with exclusive access to the document under `key`
    pub fn with_document<F, T>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let document = self
            .registry()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::UnknownDocument(key.to_string()))?;

        let mut guard = document.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Drop the document under `key`; returns false if there was none
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.registry().remove(key).is_some();
        if removed {
            debug!("Removed document '{}'", key);
        }
        removed
    }

    /// Check whether a document is registered under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.registry().contains_key(key)
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<Document>>>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
