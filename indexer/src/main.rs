use anyhow::{bail, Context, Result};
use bm25comp::{AnalyzingTokenizer, Bm25Params, Builder, Reader, Tokenizer, WhitespaceTokenizer};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One input document: either raw text or pre-tokenized content.
#[derive(Debug, Deserialize)]
struct InputDoc {
    id: serde_json::Value,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tokens: Option<Vec<String>>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query compact BM25 index files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from JSON/JSONL files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index file
        #[arg(long)]
        output: String,
        /// Term frequency saturation
        #[arg(long, default_value_t = bm25comp::config::DEFAULT_K1)]
        k1: f32,
        /// Length normalization
        #[arg(long, default_value_t = bm25comp::config::DEFAULT_B)]
        b: f32,
        /// Stem and drop stop words instead of plain whitespace splitting
        #[arg(long, default_value_t = false)]
        analyze: bool,
    },
    /// Run a ranked query against an index file
    Search {
        #[arg(long)]
        index: String,
        #[arg(long)]
        query: String,
        #[arg(short, long, default_value_t = 10)]
        k: usize,
        /// Must match the tokenizer the index was built with
        #[arg(long, default_value_t = false)]
        analyze: bool,
    },
    /// Print statistics about an index file
    Stats {
        #[arg(long)]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, k1, b, analyze } => {
            let params = Bm25Params::new(k1, b)?;
            if analyze {
                build_index(Builder::with_tokenizer(params, AnalyzingTokenizer)?, &input, &output)
            } else {
                build_index(Builder::with_tokenizer(params, WhitespaceTokenizer)?, &input, &output)
            }
        }
        Commands::Search { index, query, k, analyze } => {
            if analyze {
                search(Reader::with_tokenizer(AnalyzingTokenizer), &index, &query, k)
            } else {
                search(Reader::with_tokenizer(WhitespaceTokenizer), &index, &query, k)
            }
        }
        Commands::Stats { index } => {
            let reader = Reader::open(&index).with_context(|| format!("loading {index}"))?;
            let size = std::fs::metadata(&index)?.len();
            let mut json = serde_json::to_value(reader.get_stats()?)?;
            json["file_size_bytes"] = size.into();
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
    }
}

fn build_index<T: Tokenizer>(mut builder: Builder<T>, input: &str, output: &str) -> Result<()> {
    let files = input_files(Path::new(input));
    if files.is_empty() {
        bail!("no .json or .jsonl files found under {input}");
    }
    for file in files {
        let ingested = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&mut builder, &file)
        } else {
            index_json(&mut builder, &file)
        };
        let count = ingested.with_context(|| format!("indexing {}", file.display()))?;
        tracing::info!(file = %file.display(), count, "ingested file");
    }

    builder.build()?;
    builder.save(output).with_context(|| format!("writing {output}"))?;
    println!("{}", serde_json::to_string_pretty(&builder.get_stats()?)?);
    Ok(())
}

fn search<T: Tokenizer>(mut reader: Reader<T>, index: &str, query: &str, k: usize) -> Result<()> {
    reader.load(index).with_context(|| format!("loading {index}"))?;
    let start = std::time::Instant::now();
    let hits = reader.search(query, k)?;
    let json = serde_json::json!({
        "query": query,
        "took_s": start.elapsed().as_secs_f64(),
        "results": hits,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn index_jsonl<T: Tokenizer>(builder: &mut Builder<T>, file: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(file)?);
    let mut count = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).with_context(|| format!("line {}", lineno + 1))?;
        ingest_doc(builder, doc)?;
        count += 1;
    }
    Ok(count)
}

/// Accepts an array of documents, a single document, or the
/// `{"key": ["token", ...]}` map used by the benchmark data sets.
fn index_json<T: Tokenizer>(builder: &mut Builder<T>, file: &Path) -> Result<usize> {
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(file)?))?;
    match json {
        serde_json::Value::Array(arr) => {
            let count = arr.len();
            for v in arr {
                ingest_doc(builder, serde_json::from_value(v)?)?;
            }
            Ok(count)
        }
        serde_json::Value::Object(map) if map.values().all(is_token_list) => {
            // documents take ids in file order
            let count = map.len();
            for (key, tokens) in map {
                let tokens: Vec<String> =
                    serde_json::from_value(tokens).with_context(|| format!("tokens of {key:?}"))?;
                builder.add_tokenized(&key, tokens.as_slice())?;
            }
            Ok(count)
        }
        serde_json::Value::Object(map) if is_single_doc(&map) => {
            ingest_doc(builder, serde_json::from_value(serde_json::Value::Object(map))?)?;
            Ok(1)
        }
        serde_json::Value::Object(_) => {
            bail!("expected a document with \"text\" or \"tokens\", or a map of key to token list")
        }
        _ => bail!("expected a JSON array or object"),
    }
}

fn is_token_list(v: &serde_json::Value) -> bool {
    v.as_array().is_some_and(|items| items.iter().all(serde_json::Value::is_string))
}

fn is_single_doc(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    let has_content = map.contains_key("text") || map.contains_key("tokens");
    has_content && map.get("id").is_some_and(|id| !id.is_array())
}

fn ingest_doc<T: Tokenizer>(builder: &mut Builder<T>, doc: InputDoc) -> Result<()> {
    let key = match doc.id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    match (doc.tokens, doc.text) {
        (Some(tokens), _) => builder.add_tokenized(&key, tokens.as_slice())?,
        (None, Some(text)) => builder.add(&key, &text)?,
        (None, None) => bail!("document {key:?} has neither \"text\" nor \"tokens\""),
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn ingests_every_input_shape() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.jsonl"),
            "{\"id\": \"doc1\", \"text\": \"The quick brown fox\"}\n\n{\"id\": 7, \"tokens\": [\"lazy\", \"dog\"]}\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), r#"{"doc3": ["quick", "brown", "dogs"]}"#).unwrap();
        fs::write(dir.path().join("c.json"), r#"[{"id": "doc4", "text": "fox den"}]"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let out = dir.path().join("out.bm25");
        build_index(Builder::default(), dir.path().to_str().unwrap(), out.to_str().unwrap()).unwrap();

        let reader = Reader::open(&out).unwrap();
        assert_eq!(reader.get_stats().unwrap().num_documents, 4);
        // files are walked in name order
        assert_eq!(reader.key(0).unwrap(), "doc1");
        assert_eq!(reader.key(1).unwrap(), "7");
        assert_eq!(reader.key(2).unwrap(), "doc3");
        let hits = reader.search("fox", 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn token_map_keeps_file_order() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bench.json");
        fs::write(&input, r#"{"zeta": ["a"], "alpha": ["b"], "mid": ["a", "b"]}"#).unwrap();
        let out = dir.path().join("out.bm25");
        build_index(Builder::default(), input.to_str().unwrap(), out.to_str().unwrap()).unwrap();

        let reader = Reader::open(&out).unwrap();
        assert_eq!(reader.key(0).unwrap(), "zeta");
        assert_eq!(reader.key(1).unwrap(), "alpha");
        assert_eq!(reader.key(2).unwrap(), "mid");
    }

    #[test]
    fn token_map_may_use_id_as_a_key() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bench.json");
        fs::write(&input, r#"{"id": ["user", "record"], "doc2": ["other"]}"#).unwrap();
        let out = dir.path().join("out.bm25");
        build_index(Builder::default(), input.to_str().unwrap(), out.to_str().unwrap()).unwrap();

        let reader = Reader::open(&out).unwrap();
        assert_eq!(reader.get_stats().unwrap().num_documents, 2);
        assert_eq!(reader.key(0).unwrap(), "id");
        assert_eq!(reader.search("record", 10).unwrap()[0].key, "id");
    }

    #[test]
    fn single_document_object() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("one.json");
        fs::write(&input, r#"{"id": 42, "text": "lone document"}"#).unwrap();
        let out = dir.path().join("out.bm25");
        build_index(Builder::default(), input.to_str().unwrap(), out.to_str().unwrap()).unwrap();
        assert_eq!(Reader::open(&out).unwrap().key(0).unwrap(), "42");
    }

    #[test]
    fn rejects_documents_without_content() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.jsonl");
        fs::write(&input, "{\"id\": \"x\"}\n").unwrap();
        let out = dir.path().join("out.bm25");
        let err = build_index(Builder::default(), input.to_str().unwrap(), out.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("neither"));
        assert!(!out.exists());
    }

    #[test]
    fn empty_input_directory_fails() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.bm25");
        assert!(build_index(Builder::default(), dir.path().to_str().unwrap(), out.to_str().unwrap()).is_err());
    }
}
