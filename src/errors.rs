use thiserror::Error;

/// Error taxonomy for the knowledge subsystem.
///
/// Read-path errors (embedding, search) are recoverable: the retrieval
/// orchestrator degrades to an empty context instead of surfacing them.
/// Write-path errors distinguish the primary setup record (fatal) from the
/// secondary knowledge index (logged only).
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Embedding provider unavailable: {reason}")]
    EmbeddingUnavailable { reason: String },

    #[error("Primary similarity search unavailable: {reason}")]
    SearchUnavailable { reason: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to persist trade setup: {0}")]
    Persistence(#[source] sqlx::Error),

    #[error("Failed to insert knowledge entry: {0}")]
    KnowledgeInsert(#[source] sqlx::Error),

    #[error("Invalid trade setup payload: {field} - {message}")]
    InvalidPayload { field: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for knowledge operations.
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

impl KnowledgeError {
    /// True for errors the read path absorbs by returning an empty context.
    /// A dimension mismatch is a configuration fault upstream (e.g. the
    /// embedding model changed) and must stay loud.
    pub fn is_degradable(&self) -> bool {
        !matches!(self, KnowledgeError::DimensionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_is_not_degradable() {
        let err = KnowledgeError::DimensionMismatch {
            expected: 1536,
            actual: 768,
        };
        assert!(!err.is_degradable());
        assert!(err.to_string().contains("1536"));
    }

    #[test]
    fn test_embedding_unavailable_is_degradable() {
        let err = KnowledgeError::EmbeddingUnavailable {
            reason: "connection refused".to_string(),
        };
        assert!(err.is_degradable());
    }
}
