use crate::config::Bm25Params;
use crate::error::{Bm25Error, Result};
use crate::index::{InvertedIndex, Posting};
use crate::registry::KeyRegistry;
use crate::DocId;
use std::collections::BTreeMap;

pub const MAGIC: u32 = 0x424D_3235;
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 7 * 4;

/// Serializes a finalized index. Output is deterministic for a given index.
///
/// All integers and floats are big-endian, all lengths are `u32`:
///
/// ```text
/// Header:     magic u32 = 0x424D3235 ("BM25"), version u32, k1 f32, b f32,
///             avgdl f32, num_documents u32, num_unique_terms u32
/// KeyMapping: count u32, then count x { doc_id u32, key_len u32, key_bytes }
/// DocLengths: count u32, then count x { doc_id u32, length u32 }
/// Postings:   num_unique_terms x { term_len u32, term_bytes, num_postings u32,
///             num_postings x { doc_id u32, term_frequency u32 } }
/// ```
pub fn encode(index: &InvertedIndex) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(index));

    put_u32(&mut buf, MAGIC);
    put_u32(&mut buf, FORMAT_VERSION);
    put_f32(&mut buf, index.params.k1);
    put_f32(&mut buf, index.params.b);
    put_f32(&mut buf, index.avgdl);
    put_u32(&mut buf, index.num_documents());
    put_u32(&mut buf, index.num_terms());

    put_u32(&mut buf, index.registry.len() as u32);
    for (doc_id, key) in index.registry.iter() {
        put_u32(&mut buf, doc_id);
        put_bytes(&mut buf, key.as_bytes());
    }

    put_u32(&mut buf, index.doc_lengths.len() as u32);
    for (doc_id, &length) in index.doc_lengths.iter().enumerate() {
        put_u32(&mut buf, doc_id as DocId);
        put_u32(&mut buf, length);
    }

    for (term, list) in &index.postings {
        put_bytes(&mut buf, term.as_bytes());
        put_u32(&mut buf, list.len() as u32);
        for p in list {
            put_u32(&mut buf, p.doc_id);
            put_u32(&mut buf, p.term_frequency);
        }
    }

    buf
}

/// Exact size of `encode(index)` in bytes.
pub fn encoded_len(index: &InvertedIndex) -> usize {
    let keys: usize = index.registry.iter().map(|(_, k)| 8 + k.len()).sum();
    let postings: usize = index.postings.iter().map(|(t, p)| 8 + t.len() + 8 * p.len()).sum();
    HEADER_LEN + 4 + keys + 4 + 8 * index.doc_lengths.len() + postings
}

pub fn decode(bytes: &[u8]) -> Result<InvertedIndex> {
    let mut r = ByteReader::new(bytes);

    let magic = r.u32("magic")?;
    if magic != MAGIC {
        return Err(Bm25Error::Format { magic });
    }
    let version = r.u32("version")?;
    if version != FORMAT_VERSION {
        return Err(Bm25Error::Version { found: version, supported: FORMAT_VERSION });
    }
    let params = Bm25Params { k1: r.f32("k1")?, b: r.f32("b")? };
    params
        .validate()
        .map_err(|e| Bm25Error::corrupt(format!("stored parameters: {e}")))?;
    let avgdl = r.f32("avgdl")?;
    if !avgdl.is_finite() || avgdl < 0.0 {
        return Err(Bm25Error::corrupt(format!("invalid avgdl {avgdl}")));
    }
    let num_documents = r.u32("num_documents")?;
    let num_terms = r.u32("num_unique_terms")?;

    let registry = decode_keys(&mut r, num_documents)?;
    let doc_lengths = decode_doc_lengths(&mut r, num_documents)?;
    let postings = decode_postings(&mut r, num_terms, num_documents)?;

    if r.remaining() != 0 {
        return Err(Bm25Error::corrupt(format!(
            "{} trailing bytes after {} declared terms",
            r.remaining(),
            num_terms
        )));
    }

    Ok(InvertedIndex { params, avgdl, registry, doc_lengths, postings })
}

fn decode_keys(r: &mut ByteReader<'_>, num_documents: u32) -> Result<KeyRegistry> {
    let count = r.u32("key mapping count")?;
    if count != num_documents {
        return Err(Bm25Error::corrupt(format!(
            "header declares {num_documents} documents but key mapping holds {count}"
        )));
    }
    r.ensure_entries(count, 8, "key mapping")?;
    let mut slots: Vec<Option<String>> = vec![None; count as usize];
    for _ in 0..count {
        let doc_id = r.u32("key doc_id")?;
        let key = r.string("key")?;
        let slot = slots
            .get_mut(doc_id as usize)
            .ok_or_else(|| Bm25Error::corrupt(format!("key mapping id {doc_id} out of range")))?;
        if slot.replace(key).is_some() {
            return Err(Bm25Error::corrupt(format!("key mapping repeats id {doc_id}")));
        }
    }
    // count distinct in-range ids fill every slot
    let keys = slots.into_iter().flatten().collect();
    Ok(KeyRegistry::from_keys(keys))
}

fn decode_doc_lengths(r: &mut ByteReader<'_>, num_documents: u32) -> Result<Vec<u32>> {
    let count = r.u32("document length count")?;
    if count != num_documents {
        return Err(Bm25Error::corrupt(format!(
            "header declares {num_documents} documents but length table holds {count}"
        )));
    }
    r.ensure_entries(count, 8, "document lengths")?;
    let mut lengths: Vec<Option<u32>> = vec![None; count as usize];
    for _ in 0..count {
        let doc_id = r.u32("length doc_id")?;
        let length = r.u32("length")?;
        let slot = lengths
            .get_mut(doc_id as usize)
            .ok_or_else(|| Bm25Error::corrupt(format!("length table id {doc_id} out of range")))?;
        if slot.replace(length).is_some() {
            return Err(Bm25Error::corrupt(format!("length table repeats id {doc_id}")));
        }
    }
    Ok(lengths.into_iter().flatten().collect())
}

fn decode_postings(
    r: &mut ByteReader<'_>,
    num_terms: u32,
    num_documents: u32,
) -> Result<BTreeMap<String, Vec<Posting>>> {
    // smallest term entry: empty term plus an empty posting list
    r.ensure_entries(num_terms, 8, "postings")?;
    let mut postings = BTreeMap::new();
    for _ in 0..num_terms {
        let term = r.string("term")?;
        let count = r.u32("posting count")?;
        r.ensure_entries(count, 8, "posting list")?;
        let mut list = Vec::with_capacity(count as usize);
        let mut prev: Option<DocId> = None;
        for _ in 0..count {
            let doc_id = r.u32("posting doc_id")?;
            let term_frequency = r.u32("term frequency")?;
            if doc_id >= num_documents {
                return Err(Bm25Error::corrupt(format!("term {term:?} references unknown document {doc_id}")));
            }
            if term_frequency == 0 {
                return Err(Bm25Error::corrupt(format!("term {term:?} has a zero frequency for document {doc_id}")));
            }
            if prev.is_some_and(|p| p >= doc_id) {
                return Err(Bm25Error::corrupt(format!("postings for {term:?} are not strictly ascending")));
            }
            prev = Some(doc_id);
            list.push(Posting { doc_id, term_frequency });
        }
        if postings.insert(term, list).is_some() {
            return Err(Bm25Error::corrupt("a term appears twice in the postings section"));
        }
    }
    Ok(postings)
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

/// Bounds-checked big-endian cursor.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Bm25Error::corrupt(format!(
                "{what} needs {len} bytes at offset {} but only {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn array4(&mut self, what: &str) -> Result<[u8; 4]> {
        let b = self.take(4, what)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.array4(what).map(u32::from_be_bytes)
    }

    fn f32(&mut self, what: &str) -> Result<f32> {
        self.array4(what).map(f32::from_be_bytes)
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let len = self.u32(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Bm25Error::corrupt(format!("{what} is not valid UTF-8")))
    }

    /// Rejects counts that cannot fit in what is left, before allocating for them.
    fn ensure_entries(&self, count: u32, min_entry_len: usize, what: &str) -> Result<()> {
        let needed = (count as usize).saturating_mul(min_entry_len);
        if needed > self.remaining() {
            return Err(Bm25Error::corrupt(format!(
                "{what} declares {count} entries but only {} bytes remain",
                self.remaining()
            )));
        }
        Ok(())
    }
}
