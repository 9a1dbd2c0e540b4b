use crate::aggregator::PostingsAggregator;
use crate::codec;
use crate::config::Bm25Params;
use crate::error::{Bm25Error, Result};
use crate::index::{IndexStats, InvertedIndex};
use crate::key::ToKeyString;
use crate::registry::KeyRegistry;
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::DocId;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Default)]
struct Accumulator {
    registry: KeyRegistry,
    aggregator: PostingsAggregator,
}

#[derive(Debug)]
enum Phase {
    Open(Accumulator),
    Built(InvertedIndex),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Open(_) => "open",
            Phase::Built(_) => "built",
        }
    }
}

/// Builds a BM25 index one document at a time.
///
/// Documents can be added while the builder is open; [`Builder::build`]
/// freezes it, after which it can be saved or inspected but not extended.
pub struct Builder<T = WhitespaceTokenizer> {
    params: Bm25Params,
    tokenizer: T,
    phase: Phase,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            params: Bm25Params::default(),
            tokenizer: WhitespaceTokenizer,
            phase: Phase::Open(Accumulator::default()),
        }
    }
}

impl Builder {
    pub fn new(params: Bm25Params) -> Result<Self> {
        Self::with_tokenizer(params, WhitespaceTokenizer)
    }
}

impl<T: Tokenizer> Builder<T> {
    pub fn with_tokenizer(params: Bm25Params, tokenizer: T) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, tokenizer, phase: Phase::Open(Accumulator::default()) })
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn is_built(&self) -> bool {
        matches!(self.phase, Phase::Built(_))
    }

    /// Tokenizes `text` and adds it as a new document.
    pub fn add<K: ToKeyString + ?Sized>(&mut self, key: &K, text: &str) -> Result<DocId> {
        self.open_state("add documents")?;
        let tokens = self.tokenizer.tokenize(text);
        self.add_tokenized(key, tokens.as_slice())
    }

    /// Adds a pre-tokenized document and returns its id.
    ///
    /// Every call creates a new document, even when `key` was seen before.
    pub fn add_tokenized<K, S>(&mut self, key: &K, tokens: &[S]) -> Result<DocId>
    where
        K: ToKeyString + ?Sized,
        S: AsRef<str>,
    {
        let state = self.open_state("add documents")?;
        let key = key.to_key_string();
        if u32::try_from(key.len()).is_err() {
            return Err(Bm25Error::Capacity(format!("document key of {} bytes", key.len())));
        }
        let doc_id = state.registry.next_id()?;
        state.aggregator.record(doc_id, tokens)?;
        state.registry.register(key)
    }

    /// Number of documents added so far.
    pub fn num_documents(&self) -> u32 {
        match &self.phase {
            Phase::Open(state) => state.aggregator.doc_count(),
            Phase::Built(index) => index.num_documents(),
        }
    }

    /// Computes avgdl and freezes the postings. Valid once, while open.
    pub fn build(&mut self) -> Result<()> {
        let state = self.open_state("build")?;
        if state.aggregator.doc_count() == 0 {
            return Err(Bm25Error::EmptyIndex);
        }
        let Accumulator { registry, aggregator } = std::mem::take(state);
        let done = aggregator.finalize()?;
        let index = InvertedIndex {
            params: self.params,
            avgdl: done.avgdl,
            registry,
            doc_lengths: done.doc_lengths,
            postings: done.postings,
        };
        tracing::info!(
            num_docs = index.num_documents(),
            num_terms = index.num_terms(),
            avgdl = index.avgdl(),
            "index built"
        );
        self.phase = Phase::Built(index);
        Ok(())
    }

    pub fn index(&self) -> Result<&InvertedIndex> {
        match &self.phase {
            Phase::Built(index) => Ok(index),
            phase => Err(Bm25Error::State { operation: "access the index", phase: phase.name() }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match &self.phase {
            Phase::Built(index) => Ok(codec::encode(index)),
            phase => Err(Bm25Error::State { operation: "encode", phase: phase.name() }),
        }
    }

    /// Writes the encoded index to `path`. Valid only after `build`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = match &self.phase {
            Phase::Built(index) => codec::encode(index),
            phase => return Err(Bm25Error::State { operation: "save", phase: phase.name() }),
        };
        let mut w = BufWriter::new(File::create(path)?);
        w.write_all(&bytes)?;
        w.flush()?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "index saved");
        Ok(())
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        match &self.phase {
            Phase::Built(index) => Ok(index.stats()),
            phase => Err(Bm25Error::State { operation: "read stats", phase: phase.name() }),
        }
    }

    fn open_state(&mut self, operation: &'static str) -> Result<&mut Accumulator> {
        match &mut self.phase {
            Phase::Open(state) => Ok(state),
            phase => Err(Bm25Error::State { operation, phase: phase.name() }),
        }
    }
}
