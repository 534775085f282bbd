use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::config::Number;
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::vector_entry::{Chunk, IndexEntry};
use crate::vector_ops::{compute_cosine_similarity_simd, normalize_vector};

#[derive(Debug, Clone)]
pub struct SearchResult<'a> {
    pub similarity: Number,
    /// Insertion position of the entry.
    pub position: usize,
    pub chunk: &'a Chunk,
}

/// Flat in-memory vector index with exact cosine search.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality fixed by the first insert.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Inserts chunks paired with their vectors. Nothing is inserted if any
    /// pair is rejected.
    pub fn insert(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<Number>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(RagError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let mut expected = self.dimensions;
        for vector in &vectors {
            check_finite(vector)?;
            match expected {
                Some(dim) if dim != vector.len() => {
                    return Err(RagError::DimensionMismatch {
                        expected: dim,
                        actual: vector.len(),
                    })
                }
                _ => expected = Some(vector.len()),
            }
        }
        self.dimensions = expected;

        self.entries.extend(chunks.into_iter().zip(vectors).map(|(chunk, mut vector)| {
            normalize_vector(&mut vector);
            IndexEntry { chunk, vector }
        }));
        debug!("Index now holds {} entries", self.entries.len());
        Ok(())
    }

    /// The `k` entries most similar to `query_vector`, best first. Equal
    /// scores keep insertion order.
    pub fn search(&self, query_vector: &[Number], k: usize) -> Result<Vec<SearchResult<'_>>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dim) = self.dimensions {
            if dim != query_vector.len() {
                return Err(RagError::DimensionMismatch {
                    expected: dim,
                    actual: query_vector.len(),
                });
            }
        }

        check_finite(query_vector)?;

        let start = Instant::now();
        let mut query = query_vector.to_vec();
        normalize_vector(&mut query);

        let mut results: Vec<SearchResult<'_>> = self
            .entries
            .par_iter()
            .enumerate()
            .map(|(position, entry)| SearchResult {
                similarity: compute_cosine_similarity_simd(&query, &entry.vector).unwrap_or(0.0),
                position,
                chunk: &entry.chunk,
            })
            .collect();

        sort_by_similarity(&mut results);
        results.truncate(k);

        debug!(
            "Scored {} entries in {:?}, returning {}",
            self.entries.len(),
            start.elapsed(),
            results.len()
        );
        Ok(results)
    }

    /// Embeds `query` with `embedder` and searches for the `k` nearest entries.
    pub fn retrieve(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult<'_>>> {
        if self.entries.is_empty() || k == 0 {
            debug!("Nothing to retrieve (entries={}, k={})", self.entries.len(), k);
            return Ok(Vec::new());
        }
        let query_vector = embedder.embed_query(query)?;
        self.search(&query_vector, k)
    }
}

fn check_finite(vector: &[Number]) -> Result<()> {
    match vector.iter().position(|x| !x.is_finite()) {
        Some(position) => Err(RagError::NonFiniteVector { position }),
        None => Ok(()),
    }
}

/// Best first. The sort is stable, so equal scores keep insertion order; a
/// NaN score ranks below every number.
fn sort_by_similarity(results: &mut [SearchResult<'_>]) {
    let key = |s: Number| if s.is_nan() { Number::NEG_INFINITY } else { s };
    results.sort_by(|a, b| key(b.similarity).total_cmp(&key(a.similarity)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::vector_entry::Metadata;

    fn chunk(text: &str, index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: Metadata {
                source: "mem".into(),
                file_name: "mem".into(),
                chunk_index: index,
                start_char: 0,
                end_char: text.chars().count(),
            },
        }
    }

    #[test]
    fn nearest_entries_come_first() {
        let mut index = VectorIndex::new();
        index
            .insert(
                vec![chunk("x", 0), chunk("y", 1), chunk("xy", 2)],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .unwrap();

        let results = index.search(&[1.0, 0.1], 3).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "xy", "y"]);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn never_returns_more_than_k() {
        let mut index = VectorIndex::new();
        let chunks: Vec<Chunk> = (0..5).map(|i| chunk(&format!("c{}", i), i)).collect();
        let vectors: Vec<Vec<Number>> = (0..5).map(|i| vec![1.0, i as Number]).collect();
        index.insert(chunks, vectors).unwrap();

        assert_eq!(index.search(&[1.0, 1.0], 3).unwrap().len(), 3);
        assert_eq!(index.search(&[1.0, 1.0], 10).unwrap().len(), 5);
        assert!(index.search(&[1.0, 1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        index
            .insert(
                vec![chunk("first", 0), chunk("second", 1), chunk("third", 2)],
                vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![5.0, 0.0]],
            )
            .unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results[0].chunk.text, "second");
        assert_eq!(results[1].chunk.text, "third");
        assert_eq!(results[0].position, 1);
    }

    #[test]
    fn rejects_mismatched_lengths_and_dimensions() {
        let mut index = VectorIndex::new();
        assert!(matches!(
            index.insert(vec![chunk("a", 0)], vec![]),
            Err(RagError::LengthMismatch { chunks: 1, vectors: 0 })
        ));
        assert!(matches!(
            index.insert(vec![chunk("a", 0), chunk("b", 1)], vec![vec![1.0, 0.0], vec![1.0]]),
            Err(RagError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(index.is_empty());

        index.insert(vec![chunk("a", 0)], vec![vec![1.0, 0.0]]).unwrap();
        assert_eq!(index.dimensions(), Some(2));
        assert!(index.insert(vec![chunk("b", 1)], vec![vec![1.0, 0.0, 0.0]]).is_err());
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn nan_scores_rank_last_and_ties_stay_stable() {
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk(&format!("c{}", i), i)).collect();
        let mut results: Vec<SearchResult<'_>> = [0.5, Number::NAN, 0.9, 0.5]
            .iter()
            .zip(&chunks)
            .enumerate()
            .map(|(position, (&similarity, chunk))| SearchResult {
                similarity,
                position,
                chunk,
            })
            .collect();

        sort_by_similarity(&mut results);
        let order: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(order, vec![2, 0, 3, 1]);
    }

    #[test]
    fn non_finite_vectors_are_rejected() {
        let mut index = VectorIndex::new();
        assert!(matches!(
            index.insert(vec![chunk("a", 0)], vec![vec![1.0, Number::INFINITY]]),
            Err(RagError::NonFiniteVector { position: 1 })
        ));
        assert!(index.is_empty());

        index.insert(vec![chunk("a", 0)], vec![vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            index.search(&[Number::NAN, 0.0], 1),
            Err(RagError::NonFiniteVector { position: 0 })
        ));
    }

    #[test]
    fn stored_vectors_are_normalized() {
        let mut index = VectorIndex::new();
        index.insert(vec![chunk("a", 0)], vec![vec![3.0, 4.0]]).unwrap();
        let v = &index.entries()[0].vector;
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn empty_index_retrieves_nothing() {
        let index = VectorIndex::new();
        let embedder = HashEmbedder::new(8);
        assert!(index.retrieve(&embedder, "anything", 4).unwrap().is_empty());
    }

    #[test]
    fn retrieve_uses_the_embedder() {
        let embedder = HashEmbedder::new(128);
        let texts = vec![
            "Llama is a language model".to_string(),
            "Paris is the capital of France".to_string(),
        ];
        let vectors = embedder.embed_documents(&texts).unwrap();
        let mut index = VectorIndex::new();
        index
            .insert(vec![chunk(&texts[0], 0), chunk(&texts[1], 1)], vectors)
            .unwrap();

        let results = index.retrieve(&embedder, "capital of France", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, texts[1]);
    }
}
