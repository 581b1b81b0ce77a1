//! Similarity memory — TF-IDF vectors ranked by cosine similarity.
//!
//! Pure-Rust implementation, fitted fresh on every search over the stored
//! contents plus the query:
//! - tokens are lowercase runs of two or more word characters
//! - smooth idf: `ln((1 + n) / (1 + df)) + 1`
//! - ranking by cosine similarity, ties broken by log order

use async_trait::async_trait;
use kangae_core::error::MemoryError;
use kangae_core::memory::Memory;
use kangae_core::message::{Message, Role};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

use crate::log::MessageLog;

/// A memory store whose `search` ranks every message by TF-IDF similarity
/// to the query.
#[derive(Default)]
pub struct VectorMemory {
    log: MessageLog,
}

impl VectorMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the stored messages, in order.
    pub async fn messages(&self) -> Vec<Message> {
        self.log.snapshot().await
    }
}

#[async_trait]
impl Memory for VectorMemory {
    async fn add(&self, role: Role, content: &str) -> Result<(), MemoryError> {
        self.log.push(Message::new(role, content)).await;
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, MemoryError> {
        let corpus = self.log.contents().await;
        if corpus.is_empty() {
            return Ok(vec![]);
        }

        let ranked = tfidf_rank(&corpus, query, top_k);
        debug!(candidates = corpus.len(), returned = ranked.len(), "Vector memory search");
        Ok(ranked.into_iter().map(|i| corpus[i].clone()).collect())
    }

    async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        self.log.save(path).await
    }

    async fn load(&self, path: &Path) -> Result<(), MemoryError> {
        self.log.load(path).await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.log.clear().await;
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    dot / denom
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Rank `corpus` indices by TF-IDF cosine similarity to `query`.
///
/// Returns at most `top_k` indices, most similar first. Equal scores keep
/// corpus order.
pub fn tfidf_rank(corpus: &[String], query: &str, top_k: usize) -> Vec<usize> {
    let mut docs: Vec<Vec<String>> = corpus.iter().map(|d| tokenize(d)).collect();
    docs.push(tokenize(query));

    // Vocabulary: term → column.
    let mut vocab: BTreeMap<&str, usize> = BTreeMap::new();
    for token in docs.iter().flatten() {
        let next = vocab.len();
        vocab.entry(token.as_str()).or_insert(next);
    }

    let mut df: HashMap<usize, usize> = HashMap::new();
    for doc in &docs {
        let mut seen: Vec<usize> = doc.iter().map(|t| vocab[t.as_str()]).collect();
        seen.sort_unstable();
        seen.dedup();
        for col in seen {
            *df.entry(col).or_default() += 1;
        }
    }

    let n = docs.len() as f64;
    let idf: Vec<f64> = (0..vocab.len())
        .map(|col| {
            let df = df.get(&col).copied().unwrap_or(0) as f64;
            ((1.0 + n) / (1.0 + df)).ln() + 1.0
        })
        .collect();

    let vectors: Vec<Vec<f64>> = docs
        .iter()
        .map(|doc| {
            let mut v = vec![0.0; vocab.len()];
            for t in doc {
                v[vocab[t.as_str()]] += 1.0;
            }
            v.iter_mut().zip(&idf).for_each(|(x, w)| *x *= w);
            v
        })
        .collect();

    let Some((query_vec, doc_vecs)) = vectors.split_last() else {
        return vec![];
    };
    let mut scored: Vec<(usize, f64)> = doc_vecs
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(v, query_vec)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored.into_iter().map(|(i, _)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn tokenizer_drops_single_characters() {
        assert_eq!(tokenize("A cat, the_dog!"), vec!["cat", "the_dog"]);
    }

    #[test]
    fn rank_prefers_shared_terms() {
        let corpus = vec![
            "the weather in tokyo is sunny".to_string(),
            "rust ownership and borrowing".to_string(),
            "borrowing rules in rust".to_string(),
        ];
        let ranked = tfidf_rank(&corpus, "rust borrowing", 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.contains(&1) && ranked.contains(&2));
    }

    #[test]
    fn ties_keep_corpus_order() {
        let corpus = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        assert_eq!(tfidf_rank(&corpus, "unrelated", 3), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn search_returns_most_similar_first() {
        let mem = VectorMemory::new();
        mem.add(Role::User, "apples and oranges").await.unwrap();
        mem.add(Role::User, "the python language").await.unwrap();
        mem.add(Role::Assistant, "python python snakes").await.unwrap();

        let results = mem.search("python snakes", 1).await.unwrap();
        assert_eq!(results, vec!["python python snakes".to_string()]);
    }

    #[tokio::test]
    async fn search_empty_store() {
        let mem = VectorMemory::new();
        assert!(mem.search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_never_exceeds_top_k() {
        let mem = VectorMemory::new();
        for i in 0..10 {
            mem.add(Role::User, &format!("entry number {i}")).await.unwrap();
        }
        assert_eq!(mem.search("entry", 3).await.unwrap().len(), 3);
    }
}
