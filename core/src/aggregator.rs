use crate::error::{Bm25Error, Result};
use crate::index::Posting;
use crate::DocId;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct PostingsAggregator {
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    total_length: u64,
}

/// Output of [`PostingsAggregator::finalize`].
#[derive(Debug)]
pub struct FinalizedPostings {
    pub avgdl: f32,
    pub doc_lengths: Vec<u32>,
    pub postings: BTreeMap<String, Vec<Posting>>,
}

impl PostingsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one document into the aggregate.
    ///
    /// Documents must be recorded in id order starting at 0. Nothing is
    /// modified when an error is returned.
    pub fn record<S: AsRef<str>>(&mut self, doc_id: DocId, tokens: &[S]) -> Result<()> {
        if doc_id as usize != self.doc_lengths.len() {
            return Err(Bm25Error::State {
                operation: "record a document out of id order",
                phase: "accumulating",
            });
        }
        let length = u32::try_from(tokens.len())
            .map_err(|_| Bm25Error::Capacity(format!("document of {} tokens", tokens.len())))?;

        let mut tf: HashMap<&str, u32> = HashMap::new();
        for token in tokens {
            let token = token.as_ref();
            if u32::try_from(token.len()).is_err() {
                return Err(Bm25Error::Capacity(format!("token of {} bytes", token.len())));
            }
            *tf.entry(token).or_insert(0) += 1;
        }

        for (term, term_frequency) in tf {
            let posting = Posting { doc_id, term_frequency };
            match self.postings.get_mut(term) {
                Some(list) => list.push(posting),
                None => {
                    self.postings.insert(term.to_owned(), vec![posting]);
                }
            }
        }
        self.doc_lengths.push(length);
        self.total_length += u64::from(length);
        tracing::trace!(doc_id, length, "recorded document");
        Ok(())
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        self.doc_lengths.get(doc_id as usize).copied()
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn finalize(self) -> Result<FinalizedPostings> {
        if self.doc_lengths.is_empty() {
            return Err(Bm25Error::EmptyIndex);
        }
        let avgdl = (self.total_length as f64 / self.doc_lengths.len() as f64) as f32;
        let postings = self
            .postings
            .into_iter()
            .map(|(term, mut list)| {
                list.sort_unstable_by_key(|p| p.doc_id);
                (term, list)
            })
            .collect();
        Ok(FinalizedPostings { avgdl, doc_lengths: self.doc_lengths, postings })
    }
}
