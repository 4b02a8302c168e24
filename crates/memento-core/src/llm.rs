//! LLM and embedding collaborators, plus the optional search provider
//! and embedding store (spec §6). Concrete HTTP clients are out of
//! scope; these traits are the seam the enrichment pipeline and
//! search orchestrator are built against.

use std::sync::Arc;

/// Error surfaced by an LLM, embedding, or search collaborator. The
/// engine maps this to `Error::ExternalUnavailable` at the boundary.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Text generation (spec §6: "Text generator").
pub trait LlmTextGenerator: Send + Sync {
    fn complete(&self, prompt: &str) -> CollaboratorResult<String>;
    fn model(&self) -> &str;
}

impl<T: LlmTextGenerator + ?Sized> LlmTextGenerator for Arc<T> {
    fn complete(&self, prompt: &str) -> CollaboratorResult<String> {
        (**self).complete(prompt)
    }
    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Dense embedding generation (spec §6: "Embedding generator").
pub trait LlmEmbeddingGenerator: Send + Sync {
    fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>>;
    fn model(&self) -> &str;
}

impl<T: LlmEmbeddingGenerator + ?Sized> LlmEmbeddingGenerator for Arc<T> {
    fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        (**self).embed(text)
    }
    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Embedding persistence, independent of the relational store (spec §6:
/// "Embedding provider").
pub trait EmbeddingStore: Send + Sync {
    fn store_embedding(&self, memory_id: &str, vector: &[f32], dimension: usize, model: &str) -> CollaboratorResult<()>;
    fn get_embedding(&self, memory_id: &str) -> CollaboratorResult<Option<crate::memory::EmbeddingMeta>>;
    fn delete_embedding(&self, memory_id: &str) -> CollaboratorResult<()>;
    fn dimension(&self, model: &str) -> CollaboratorResult<usize>;
}

impl<T: EmbeddingStore + ?Sized> EmbeddingStore for Arc<T> {
    fn store_embedding(&self, memory_id: &str, vector: &[f32], dimension: usize, model: &str) -> CollaboratorResult<()> {
        (**self).store_embedding(memory_id, vector, dimension, model)
    }
    fn get_embedding(&self, memory_id: &str) -> CollaboratorResult<Option<crate::memory::EmbeddingMeta>> {
        (**self).get_embedding(memory_id)
    }
    fn delete_embedding(&self, memory_id: &str) -> CollaboratorResult<()> {
        (**self).delete_embedding(memory_id)
    }
    fn dimension(&self, model: &str) -> CollaboratorResult<usize> {
        (**self).dimension(model)
    }
}

/// Optional full-text/vector/hybrid search, opt-in via capability
/// check rather than a marker type (spec §6: "Opt-in via capability
/// check").
pub trait SearchProvider: Send + Sync {
    fn full_text_search(&self, query: &str, options: &crate::store::ListOptions) -> CollaboratorResult<crate::store::PaginatedResult<crate::memory::Memory>>;
    fn vector_search(&self, vector: &[f32], options: &crate::store::ListOptions) -> CollaboratorResult<crate::store::PaginatedResult<crate::memory::Memory>>;
    fn hybrid_search(&self, text: &str, vector: &[f32], options: &crate::store::ListOptions) -> CollaboratorResult<crate::store::PaginatedResult<crate::memory::Memory>>;
}

impl<T: SearchProvider + ?Sized> SearchProvider for Arc<T> {
    fn full_text_search(&self, query: &str, options: &crate::store::ListOptions) -> CollaboratorResult<crate::store::PaginatedResult<crate::memory::Memory>> {
        (**self).full_text_search(query, options)
    }
    fn vector_search(&self, vector: &[f32], options: &crate::store::ListOptions) -> CollaboratorResult<crate::store::PaginatedResult<crate::memory::Memory>> {
        (**self).vector_search(vector, options)
    }
    fn hybrid_search(&self, text: &str, vector: &[f32], options: &crate::store::ListOptions) -> CollaboratorResult<crate::store::PaginatedResult<crate::memory::Memory>> {
        (**self).hybrid_search(text, vector, options)
    }
}
