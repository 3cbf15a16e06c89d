// sqlx codec for pgvector's `vector` column type.
// Encodes with the binary protocol; decodes the `[x,y,z]` text form.

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgHasArrayType, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

/// Wrapper type for pgvector's vector type
#[derive(Debug, Clone, PartialEq)]
pub struct PgVector(pub Vec<f32>);

impl PgVector {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<f32>> for PgVector {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl From<PgVector> for Vec<f32> {
    fn from(vec: PgVector) -> Self {
        vec.0
    }
}

impl Type<Postgres> for PgVector {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("vector")
    }
}

impl PgHasArrayType for PgVector {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_vector")
    }
}

impl Encode<'_, Postgres> for PgVector {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        // pgvector binary layout: u16 dimension count (big-endian),
        // u16 unused, then each component as a big-endian f32.
        let dim = u16::try_from(self.0.len())
            .map_err(|_| format!("vector has too many dimensions: {}", self.0.len()))?;

        buf.extend_from_slice(&dim.to_be_bytes());
        buf.extend_from_slice(&[0u8, 0u8]);
        for &value in &self.0 {
            buf.extend_from_slice(&value.to_be_bytes());
        }

        Ok(IsNull::No)
    }
}

impl Decode<'_, Postgres> for PgVector {
    fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
        // Text form: [1.0,2.0,3.0]
        let s = <&str as Decode<Postgres>>::decode(value)?;

        let s = s.trim();
        let content = s
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| format!("Invalid vector format: expected [x,y,z], got {}", s))?;

        if content.is_empty() {
            return Ok(PgVector(Vec::new()));
        }

        let floats = content
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|e| format!("Failed to parse vector components: {}", e))?;

        Ok(PgVector(floats))
    }
}

/// Cosine similarity between two vectors, mapped to [0, 1] the way the
/// `match_knowledge` function reports it (1 - cosine distance). Returns None
/// when dimensions disagree or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pgvector_roundtrip_accessors() {
        let vec = vec![1.0, 2.0, 3.0];
        let pg_vec = PgVector::new(vec.clone());
        assert_eq!(pg_vec.dimension(), 3);
        assert_eq!(pg_vec.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(pg_vec.into_inner(), vec);
    }

    #[test]
    fn test_pgvector_from_conversions() {
        let vec = vec![4.0, 5.0, 6.0];
        let pg_vec = PgVector::from(vec.clone());
        assert_eq!(Vec::from(pg_vec), vec);
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, -0.25, 1.0];
        let sim = cosine_similarity(&v, &v).expect("similarity should compute");
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let sim = cosine_similarity(&a, &b).expect("similarity should compute");
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_rejects_mismatched_or_zero() {
        assert!(cosine_similarity(&[1.0, 2.0], &[1.0]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_none());
        assert!(cosine_similarity(&[], &[]).is_none());
    }
}
