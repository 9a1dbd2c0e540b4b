use crate::error::Result;
use crate::index::InvertedIndex;
use crate::DocId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub key: String,
    pub score: f32,
}

/// IDF with lower-bound smoothing: `ln(1 + (N - df + 0.5) / (df + 0.5))`, never negative.
#[inline]
pub fn bm25_idf(doc_freq: u32, num_docs: u32) -> f32 {
    let df = doc_freq as f32;
    let n = num_docs as f32;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

/// Contribution of one term occurrence count to a document's score.
#[inline]
pub fn bm25_term_score(tf: u32, idf: f32, doc_len: u32, avgdl: f32, k1: f32, b: f32) -> f32 {
    let tf = tf as f32;
    // avgdl is only 0 when every document is empty, in which case nothing is ever scored
    let relative_len = if avgdl > 0.0 { doc_len as f32 / avgdl } else { 0.0 };
    let length_norm = 1.0 - b + b * relative_len;
    idf * (tf * (k1 + 1.0)) / (tf + k1 * length_norm)
}

pub struct Bm25Scorer<'a> {
    index: &'a InvertedIndex,
}

impl<'a> Bm25Scorer<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    pub fn idf(&self, term: &str) -> f32 {
        match self.index.doc_frequency(term) {
            0 => 0.0,
            df => bm25_idf(df, self.index.num_documents()),
        }
    }

    /// Top `top_k` documents by descending score, ties broken by ascending id.
    pub fn search<S: AsRef<str>>(&self, query_tokens: &[S], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(DocId, f32)> = self.accumulate(query_tokens).into_iter().collect();
        if scored.len() > top_k {
            scored.select_nth_unstable_by(top_k - 1, rank);
            scored.truncate(top_k);
        }
        scored.sort_unstable_by(rank);

        scored
            .into_iter()
            .map(|(doc_id, score)| {
                let key = self.index.registry.resolve(doc_id)?.to_owned();
                Ok(SearchHit { doc_id, key, score })
            })
            .collect()
    }

    /// Score of a single document, 0.0 when it matches no query term or does not exist.
    pub fn score_document<S: AsRef<str>>(&self, query_tokens: &[S], doc_id: DocId) -> f32 {
        let Some(doc_len) = self.index.doc_length(doc_id) else {
            return 0.0;
        };
        let params = self.index.params;
        let mut score = 0.0f32;
        for term in distinct(query_tokens) {
            let Some(postings) = self.index.postings(term) else { continue };
            if let Ok(i) = postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
                let idf = bm25_idf(postings.len() as u32, self.index.num_documents());
                score += bm25_term_score(postings[i].term_frequency, idf, doc_len, self.index.avgdl, params.k1, params.b);
            }
        }
        score
    }

    fn accumulate<S: AsRef<str>>(&self, query_tokens: &[S]) -> HashMap<DocId, f32> {
        let params = self.index.params;
        let num_docs = self.index.num_documents();
        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for term in distinct(query_tokens) {
            let Some(postings) = self.index.postings(term) else { continue };
            let idf = bm25_idf(postings.len() as u32, num_docs);
            for p in postings {
                let doc_len = self.index.doc_length(p.doc_id).unwrap_or(0);
                let s = bm25_term_score(p.term_frequency, idf, doc_len, self.index.avgdl, params.k1, params.b);
                *scores.entry(p.doc_id).or_insert(0.0) += s;
            }
        }
        scores
    }
}

/// Query terms in first-occurrence order, each once.
fn distinct<S: AsRef<str>>(tokens: &[S]) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    tokens.iter().map(|t| t.as_ref()).filter(move |t| seen.insert(*t))
}

fn rank(a: &(DocId, f32), b: &(DocId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::PostingsAggregator;
    use crate::config::Bm25Params;
    use crate::registry::KeyRegistry;

    fn build_corpus(params: Bm25Params, docs: &[(&str, &[&str])]) -> InvertedIndex {
        let mut registry = KeyRegistry::new();
        let mut agg = PostingsAggregator::new();
        for (key, tokens) in docs {
            let id = registry.register(*key).unwrap();
            agg.record(id, *tokens).unwrap();
        }
        let done = agg.finalize().unwrap();
        InvertedIndex { params, avgdl: done.avgdl, registry, doc_lengths: done.doc_lengths, postings: done.postings }
    }

    fn fox_corpus() -> InvertedIndex {
        build_corpus(
            Bm25Params::default(),
            &[
                ("doc1", &["the", "quick", "brown", "fox"]),
                ("doc2", &["the", "lazy", "dog"]),
                ("doc3", &["quick", "brown", "dogs"]),
            ],
        )
    }

    #[test]
    fn idf_is_never_negative() {
        assert!(bm25_idf(10, 10) > 0.0);
        assert!((bm25_idf(1, 3) - (1.0f32 + 2.5 / 1.5).ln()).abs() < 1e-6);
    }

    #[test]
    fn exact_token_matching() {
        let idx = fox_corpus();
        let hits = Bm25Scorer::new(&idx).search(&["quick", "dog"], 10).unwrap();
        let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["doc2", "doc3", "doc1"]);

        // "dogs" is a different token from "dog"
        let hits = Bm25Scorer::new(&idx).search(&["dog"], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "doc2");
    }

    #[test]
    fn shorter_document_wins_with_length_normalization() {
        let idx = fox_corpus();
        let scorer = Bm25Scorer::new(&idx);
        let doc1 = scorer.score_document(&["quick"], 0);
        let doc3 = scorer.score_document(&["quick"], 2);
        assert!(doc3 > doc1 && doc1 > 0.0);
        assert!((doc1 - 0.431_23).abs() < 1e-4, "doc1 = {doc1}");
        assert!((doc3 - 0.492_15).abs() < 1e-4, "doc3 = {doc3}");
    }

    #[test]
    fn without_length_normalization_equal_tf_ties_by_id() {
        let idx = build_corpus(
            Bm25Params::new(1.5, 0.0).unwrap(),
            &[("long", &["a", "x", "y", "z"]), ("short", &["a"])],
        );
        let hits = Bm25Scorer::new(&idx).search(&["a"], 10).unwrap();
        assert_eq!(hits[0].score, hits[1].score);
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[1].doc_id, 1);
    }

    #[test]
    fn repeated_query_terms_count_once() {
        let idx = fox_corpus();
        let scorer = Bm25Scorer::new(&idx);
        let once = scorer.search(&["quick"], 10).unwrap();
        let twice = scorer.search(&["quick", "quick"], 10).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn search_agrees_with_score_document() {
        let idx = fox_corpus();
        let scorer = Bm25Scorer::new(&idx);
        let query = ["the", "brown", "dog"];
        for hit in scorer.search(&query, 10).unwrap() {
            assert_eq!(hit.score, scorer.score_document(&query, hit.doc_id));
        }
    }

    #[test]
    fn top_k_bounds() {
        let idx = fox_corpus();
        let scorer = Bm25Scorer::new(&idx);
        assert!(scorer.search(&["the"], 0).unwrap().is_empty());
        assert_eq!(scorer.search(&["the"], 1).unwrap().len(), 1);
        assert_eq!(scorer.search(&["the"], 50).unwrap().len(), 2);
    }

    #[test]
    fn unknown_terms_and_documents() {
        let idx = fox_corpus();
        let scorer = Bm25Scorer::new(&idx);
        assert!(scorer.search(&["nonexistent", "xyz"], 10).unwrap().is_empty());
        assert_eq!(scorer.idf("nonexistent"), 0.0);
        assert_eq!(scorer.score_document(&["quick"], 99), 0.0);
        assert_eq!(scorer.score_document(&["lazy"], 0), 0.0);
    }

    #[test]
    fn partial_selection_matches_full_sort() {
        let docs: Vec<(String, Vec<String>)> = (0..40)
            .map(|i| (format!("d{i}"), (0..(i % 7 + 1)).map(|j| if j % 2 == 0 { "x".into() } else { format!("w{j}") }).collect()))
            .collect();
        let refs: Vec<(&str, Vec<&str>)> =
            docs.iter().map(|(k, t)| (k.as_str(), t.iter().map(String::as_str).collect())).collect();
        let slices: Vec<(&str, &[&str])> = refs.iter().map(|(k, t)| (*k, t.as_slice())).collect();
        let idx = build_corpus(Bm25Params::default(), &slices);
        let scorer = Bm25Scorer::new(&idx);
        let all = scorer.search(&["x", "w3"], 100).unwrap();
        let top = scorer.search(&["x", "w3"], 5).unwrap();
        assert_eq!(&all[..5], &top[..]);
    }
}
