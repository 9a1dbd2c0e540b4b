use crate::error::{Bm25Error, Result};
use crate::DocId;

/// Maps sequential document ids to their keys.
///
/// Ids are allocated densely from 0 in registration order, one per call.
/// Keys are not required to be unique: registering the same key twice yields
/// two ids that both resolve to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRegistry {
    keys: Vec<String>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_keys(keys: Vec<String>) -> Self {
        Self { keys }
    }

    /// Id the next `register` call will hand out.
    pub fn next_id(&self) -> Result<DocId> {
        DocId::try_from(self.keys.len())
            .ok()
            .filter(|id| *id < DocId::MAX)
            .ok_or_else(|| Bm25Error::Capacity(format!("more than {} documents", DocId::MAX)))
    }

    pub fn register(&mut self, key: impl Into<String>) -> Result<DocId> {
        let key = key.into();
        let doc_id = self.next_id()?;
        if u32::try_from(key.len()).is_err() {
            return Err(Bm25Error::Capacity(format!("document key of {} bytes", key.len())));
        }
        self.keys.push(key);
        Ok(doc_id)
    }

    pub fn resolve(&self, doc_id: DocId) -> Result<&str> {
        self.keys
            .get(doc_id as usize)
            .map(String::as_str)
            .ok_or(Bm25Error::Lookup { doc_id })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(id, key)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &str)> + '_ {
        self.keys.iter().enumerate().map(|(i, k)| (i as DocId, k.as_str()))
    }
}
