//! Compact BM25 inverted indexes with a fixed, language-independent binary layout.
//!
//! ```no_run
//! use bm25comp::{Builder, Reader};
//!
//! # fn main() -> bm25comp::Result<()> {
//! let mut builder = Builder::default();
//! builder.add("doc1", "the quick brown fox")?;
//! builder.add("doc2", "the lazy dog")?;
//! builder.build()?;
//! builder.save("index.bm25")?;
//!
//! let reader = Reader::open("index.bm25")?;
//! for hit in reader.search("quick fox", 10)? {
//!     println!("{} {:.3}", hit.key, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod builder;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod key;
pub mod reader;
pub mod registry;
pub mod scorer;
pub mod tokenizer;

pub type DocId = u32;

pub use builder::Builder;
pub use config::Bm25Params;
pub use error::{Bm25Error, Result};
pub use index::{IndexStats, InvertedIndex, Posting};
pub use key::ToKeyString;
pub use reader::Reader;
pub use scorer::SearchHit;
pub use tokenizer::{AnalyzingTokenizer, Tokenizer, WhitespaceTokenizer};
