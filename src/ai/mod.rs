//! Provider seams for the generative-text and vector backends.
//!
//! Both backends are external collaborators; only their call contracts live
//! here. The traits are object-safe so the resolver, flow engine and
//! orchestrator take `Arc<dyn …>` and tests substitute stubs.
//!
//! Failure policy: every provider error is a [`ProviderError`] the caller maps
//! to a fallback branch (rule/template paths). Nothing in this module retries
//! and nothing here is allowed to abort a request.

mod ollama;
pub mod prompts;

pub use ollama::{OllamaChat, OllamaEmbedder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// A role-tagged chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Generative text provider: ordered messages in, free text out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}

/// Vector similarity provider: text in, fixed-dimension normalized vector out.
///
/// Deterministic for a given model version; the resolver treats it as a pure
/// function.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Cosine similarity. Provider vectors are normalized, but the norms are
/// divided out anyway so catalog rows with unnormalized vectors still score
/// correctly.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_mismatched_or_empty() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_unnormalized_inputs() {
        // Same direction, different magnitudes
        assert!((cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
