use bm25comp::codec::{decode, encode};
use bm25comp::{Builder, Reader};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Deterministic synthetic corpus: `num_docs` documents of 10..100 tokens
/// drawn from a `vocab_size` word vocabulary.
fn corpus(num_docs: usize, vocab_size: u64) -> Vec<(String, Vec<String>)> {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        state >> 33
    };
    (0..num_docs)
        .map(|i| {
            let len = 10 + next() % 91;
            // squaring skews draws toward low ids, giving a Zipf-like spread
            let tokens = (0..len)
                .map(|_| {
                    let r = next() % vocab_size;
                    format!("w{}", r * r / vocab_size)
                })
                .collect();
            (format!("doc_{i}"), tokens)
        })
        .collect()
}

fn build(docs: &[(String, Vec<String>)]) -> Builder {
    let mut b = Builder::default();
    for (key, tokens) in docs {
        b.add_tokenized(key, tokens.as_slice()).unwrap();
    }
    b.build().unwrap();
    b
}

fn bench_build(c: &mut Criterion) {
    let docs = corpus(2_000, 5_000);
    c.bench_function("build_2k_docs", |b| b.iter(|| build(black_box(&docs))));
}

fn bench_codec(c: &mut Criterion) {
    let builder = build(&corpus(2_000, 5_000));
    let index = builder.index().unwrap();
    let bytes = encode(index);
    c.bench_function("encode_2k_docs", |b| b.iter(|| encode(black_box(index))));
    c.bench_function("decode_2k_docs", |b| b.iter(|| decode(black_box(&bytes)).unwrap()));
}

fn bench_search(c: &mut Criterion) {
    let builder = build(&corpus(10_000, 5_000));
    let mut reader = Reader::new();
    reader.load_bytes(&builder.to_bytes().unwrap()).unwrap();
    let queries: Vec<Vec<String>> = corpus(50, 5_000).into_iter().map(|(_, t)| t.into_iter().take(3).collect()).collect();
    c.bench_function("search_top10_10k_docs", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(reader.search_tokenized(q.as_slice(), 10).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_build, bench_codec, bench_search);
criterion_main!(benches);
