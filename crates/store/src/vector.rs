//! pgvector text literals.
//!
//! `vector` columns accept `[v1,v2,...,vn]`. We emit Rust's default float
//! formatting (shortest string that parses back to the same `f32`), comma
//! separated, no whitespace. NaN and infinities have no pgvector spelling and
//! are rejected up front.

use std::fmt::Write as _;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VectorError {
    #[error("invalid vector: {0}")]
    InvalidVector(String),
}

/// Encode `values` as a pgvector literal.
pub fn encode_vector(values: &[f32]) -> Result<String, VectorError> {
    if values.is_empty() {
        return Err(VectorError::InvalidVector("vector is empty".into()));
    }
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(VectorError::InvalidVector(format!(
            "non-finite value {} at index {idx}",
            values[idx]
        )));
    }

    let mut literal = String::with_capacity(values.len() * 12 + 2);
    literal.push('[');
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            literal.push(',');
        }
        // Writing into a String cannot fail.
        let _ = write!(literal, "{value}");
    }
    literal.push(']');
    Ok(literal)
}

/// Parse a pgvector literal back into its values.
///
/// Accepts whitespace around elements (pgvector's own output never has any,
/// but hand-written literals sometimes do).
pub fn parse_vector_literal(literal: &str) -> Result<Vec<f32>, VectorError> {
    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| VectorError::InvalidVector("literal must be enclosed in `[` `]`".into()))?;

    if inner.trim().is_empty() {
        return Err(VectorError::InvalidVector("vector is empty".into()));
    }

    inner
        .split(',')
        .enumerate()
        .map(|(idx, part)| {
            let value: f32 = part.trim().parse().map_err(|_| {
                VectorError::InvalidVector(format!("element {idx} is not a number"))
            })?;
            if !value.is_finite() {
                return Err(VectorError::InvalidVector(format!(
                    "non-finite value {value} at index {idx}"
                )));
            }
            Ok(value)
        })
        .collect()
}
