use crate::DocId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Bm25Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot {operation} while the index is {phase}")]
    State {
        operation: &'static str,
        phase: &'static str,
    },
    #[error("cannot build an index with no documents")]
    EmptyIndex,
    #[error("not a BM25 index: bad magic number 0x{magic:08X}")]
    Format { magic: u32 },
    #[error("unsupported BM25 index version {found} (supported: {supported})")]
    Version { found: u32, supported: u32 },
    #[error("corrupt index data: {0}")]
    CorruptData(String),
    #[error("document id {doc_id} is not registered")]
    Lookup { doc_id: DocId },
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Bm25Error>;

impl Bm25Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Bm25Error::CorruptData(msg.into())
    }
}
