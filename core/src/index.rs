use crate::config::Bm25Params;
use crate::registry::KeyRegistry;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

/// A finalized, immutable BM25 index.
///
/// Posting lists are sorted by `doc_id` with no duplicates, and every id they
/// reference lies in `[0, num_documents)`. Terms iterate in ascending byte
/// order, which is also the order they are written in.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedIndex {
    pub(crate) params: Bm25Params,
    pub(crate) avgdl: f32,
    pub(crate) registry: KeyRegistry,
    pub(crate) doc_lengths: Vec<u32>,
    pub(crate) postings: BTreeMap<String, Vec<Posting>>, // postings sorted by doc_id
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub num_documents: u32,
    pub num_unique_terms: u32,
    pub average_document_length: f32,
    pub k1: f32,
    pub b: f32,
    pub total_postings: u64,
}

impl InvertedIndex {
    pub fn params(&self) -> Bm25Params { self.params }
    pub fn avgdl(&self) -> f32 { self.avgdl }
    pub fn registry(&self) -> &KeyRegistry { &self.registry }
    pub fn doc_lengths(&self) -> &[u32] { &self.doc_lengths }

    pub fn num_documents(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    pub fn num_terms(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        self.doc_lengths.get(doc_id as usize).copied()
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    /// Number of documents containing `term`.
    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.postings.get(term).map_or(0, |p| p.len() as u32)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> + '_ {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            num_documents: self.num_documents(),
            num_unique_terms: self.num_terms(),
            average_document_length: self.avgdl,
            k1: self.params.k1,
            b: self.params.b,
            total_postings: self.postings.values().map(|p| p.len() as u64).sum(),
        }
    }
}
