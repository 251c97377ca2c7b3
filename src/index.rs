//! In-memory vector index over one document's chunks.
//!
//! [`VectorIndex::build`] embeds every chunk and keeps `(chunk, vector)`
//! pairs in insertion order; [`VectorIndex::search`] is a brute-force
//! k-nearest-neighbor scan. The index is immutable once built and is only
//! valid for the document its chunks came from.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::config::DistanceMetric;
use crate::embedding::{cosine_similarity, l2_distance, EmbeddingProvider};
use crate::error::PipelineError;
use crate::models::Chunk;

/// A retrieved chunk with its score under the index's metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity (higher is nearer) or L2 distance (lower is nearer).
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dims: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    pub fn empty(metric: DistanceMetric) -> Self {
        Self {
            entries: Vec::new(),
            dims: 0,
            metric,
        }
    }

    /// Embed `chunks` in batches of `batch_size` and index them.
    ///
    /// Fails as a whole on the first provider error, on a vector count that
    /// does not match the batch, or on vectors of differing dimension.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        chunks: Vec<Chunk>,
        batch_size: usize,
        metric: DistanceMetric,
    ) -> Result<Self, PipelineError> {
        if chunks.is_empty() {
            return Ok(Self::empty(metric));
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = provider.embed(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(PipelineError::embedding(format!(
                    "provider returned {} vectors for {} inputs",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }

        let dims = vectors.first().map(Vec::len).unwrap_or(0);
        if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
            return Err(PipelineError::embedding(
                "provider returned empty or mixed-dimension vectors",
            ));
        }

        info!(
            chunks = chunks.len(),
            dims,
            model = provider.model_name(),
            "built vector index"
        );
        Ok(Self {
            entries: chunks.into_iter().zip(vectors).collect(),
            dims,
            metric,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(c, _)| c)
    }

    /// The `k` chunks nearest to `query_vec`, nearest first. Equal scores
    /// keep insertion order.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: match self.metric {
                    DistanceMetric::Cosine => cosine_similarity(query_vec, vector),
                    DistanceMetric::L2 => l2_distance(query_vec, vector),
                },
            })
            .collect();

        // sort_by is stable, which gives the insertion-order tie break.
        let metric = self.metric;
        scored.sort_by(|a, b| {
            let ord = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
            match metric {
                DistanceMetric::Cosine => ord.reverse(),
                DistanceMetric::L2 => ord,
            }
        });
        scored.truncate(k);
        scored
    }
}

/// Embed `query` with the same provider that built the index and return the
/// `k` nearest chunks. An empty index returns nothing without calling the provider.
pub async fn retrieve(
    provider: &dyn EmbeddingProvider,
    index: &VectorIndex,
    query: &str,
    k: usize,
) -> Result<Vec<ScoredChunk>, PipelineError> {
    if index.is_empty() {
        return Ok(Vec::new());
    }
    let query_vec = provider.embed_query(query).await?;
    if query_vec.len() != index.dims() {
        return Err(PipelineError::embedding(format!(
            "query embedding has {} dimensions, index has {}",
            query_vec.len(),
            index.dims()
        )));
    }
    let hits = index.search(&query_vec, k);
    debug!(hits = hits.len(), k, "retrieved chunks");
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Returns a fixed vector per known text; unknown text embeds to zeros.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(pairs: &[(&str, [f32; 2])]) -> Self {
            Self {
                table: pairs
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        fn model_name(&self) -> &str {
            "table"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect())
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(vec![vec![1.0]])
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(&DocumentId::of_bytes(b"doc"), i, t))
            .collect()
    }

    #[tokio::test]
    async fn nearest_first_with_insertion_order_ties() {
        let embedder = TableEmbedder::new(&[
            ("east", [1.0, 0.0]),
            ("north", [0.0, 1.0]),
            ("also east", [2.0, 0.0]),
            ("q", [1.0, 0.1]),
        ]);
        let index = VectorIndex::build(
            &embedder,
            chunks(&["north", "east", "also east"]),
            2,
            DistanceMetric::Cosine,
        )
        .await
        .unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dims(), 2);
        // Two batches of size 2 and 1.
        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 2);

        let hits = retrieve(&embedder, &index, "q", 4).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "also east", "north"]);
    }

    #[tokio::test]
    async fn l2_orders_by_ascending_distance() {
        let embedder = TableEmbedder::new(&[
            ("near", [1.0, 1.0]),
            ("far", [5.0, 5.0]),
            ("q", [0.0, 0.0]),
        ]);
        let index = VectorIndex::build(&embedder, chunks(&["far", "near"]), 10, DistanceMetric::L2)
            .await
            .unwrap();
        let hits = retrieve(&embedder, &index, "q", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "near");
    }

    #[tokio::test]
    async fn empty_index_skips_provider() {
        let embedder = TableEmbedder::new(&[]);
        let index = VectorIndex::build(&embedder, Vec::new(), 10, DistanceMetric::Cosine)
            .await
            .unwrap();
        assert!(index.is_empty());
        let hits = retrieve(&embedder, &index, "anything", 4).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn vector_count_mismatch_fails_build() {
        let err = VectorIndex::build(
            &ShortEmbedder,
            chunks(&["a", "b"]),
            10,
            DistanceMetric::Cosine,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::EmbeddingService(_)));
    }

    #[test]
    fn search_truncates_to_k() {
        let mut index = VectorIndex::empty(DistanceMetric::Cosine);
        index.entries = chunks(&["a", "b", "c"])
            .into_iter()
            .map(|c| (c, vec![1.0, 0.0]))
            .collect();
        index.dims = 2;
        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "a");
        assert_eq!(hits[1].chunk.text, "b");
    }
}
