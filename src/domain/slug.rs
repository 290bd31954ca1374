//! Group slug derivation and validation.
//!
//! Slugs are produced by the `slug` crate, which transliterates non-ASCII input
//! (so "Тестовая группа" becomes `testovaia-gruppa`). A slug supplied by an
//! operator is accepted only when it is already in that canonical form.

use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("`{input}` is not a canonical slug (expected `{expected}`)")]
    NotCanonical { input: String, expected: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Accept `input` only if slugifying it is a no-op.
pub fn validate_slug(input: &str) -> Result<&str, SlugError> {
    let expected = derive_slug(input)?;
    if expected != input {
        return Err(SlugError::NotCanonical {
            input: input.to_string(),
            expected,
        });
    }
    Ok(input)
}
