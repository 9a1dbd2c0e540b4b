use crate::codec;
use crate::error::{Bm25Error, Result};
use crate::index::{IndexStats, InvertedIndex};
use crate::scorer::{Bm25Scorer, SearchHit};
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::DocId;
use std::path::Path;

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Unloaded,
    Loaded(InvertedIndex),
}

/// Read-only view over a decoded index.
///
/// Once loaded the index never changes, so a shared `&Reader` can serve
/// searches from several threads at once.
#[derive(Default)]
pub struct Reader<T = WhitespaceTokenizer> {
    tokenizer: T,
    phase: Phase,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path` into a fresh reader with the default tokenizer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = Self::new();
        reader.load(path)?;
        Ok(reader)
    }
}

impl<T: Tokenizer> Reader<T> {
    pub fn with_tokenizer(tokenizer: T) -> Self {
        Self { tokenizer, phase: Phase::Unloaded }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.phase, Phase::Loaded(_))
    }

    /// Decodes the file at `path`. On failure the reader is left untouched.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let index = decode_logged(&bytes)?;
        tracing::info!(
            path = %path.display(),
            num_docs = index.num_documents(),
            num_terms = index.num_terms(),
            "index loaded"
        );
        self.phase = Phase::Loaded(index);
        Ok(())
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.phase = Phase::Loaded(decode_logged(bytes)?);
        Ok(())
    }

    pub fn index(&self) -> Result<&InvertedIndex> {
        self.loaded("access the index")
    }

    /// Tokenizes `query` with this reader's tokenizer, then ranks.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let index = self.loaded("search")?;
        let tokens = self.tokenizer.tokenize(query);
        Bm25Scorer::new(index).search(tokens.as_slice(), top_k)
    }

    /// Ranks documents for already-tokenized query terms, best first.
    pub fn search_tokenized<S: AsRef<str>>(&self, query_tokens: &[S], top_k: usize) -> Result<Vec<SearchHit>> {
        let index = self.loaded("search")?;
        Bm25Scorer::new(index).search(query_tokens, top_k)
    }

    pub fn score_document<S: AsRef<str>>(&self, query_tokens: &[S], doc_id: DocId) -> Result<f32> {
        let index = self.loaded("score")?;
        Ok(Bm25Scorer::new(index).score_document(query_tokens, doc_id))
    }

    pub fn doc_frequency(&self, term: &str) -> Result<u32> {
        Ok(self.loaded("read document frequencies")?.doc_frequency(term))
    }

    pub fn key(&self, doc_id: DocId) -> Result<&str> {
        self.loaded("resolve keys")?.registry().resolve(doc_id)
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        Ok(self.loaded("read stats")?.stats())
    }

    fn loaded(&self, operation: &'static str) -> Result<&InvertedIndex> {
        match &self.phase {
            Phase::Loaded(index) => Ok(index),
            Phase::Unloaded => Err(Bm25Error::State { operation, phase: "not loaded" }),
        }
    }
}

fn decode_logged(bytes: &[u8]) -> Result<InvertedIndex> {
    codec::decode(bytes).map_err(|e| {
        tracing::warn!(error = %e, len = bytes.len(), "failed to decode index");
        e
    })
}
