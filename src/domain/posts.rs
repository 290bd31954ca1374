//! Input-boundary validation for posts and comments.

use super::error::DomainError;

/// Submitted post fields before they reach storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    /// Slug of the group to file the post under.
    pub group: Option<String>,
    pub image: Option<String>,
}

/// Submitted comment fields before they reach storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub text: String,
}

impl PostDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, slug: impl Into<String>) -> Self {
        self.group = Some(slug.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Normalise the draft, rejecting empty text.
    ///
    /// Blank `group`/`image` values count as "not provided".
    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            text: required_text("text", &self.text, "Enter the post text.")?,
            group: optional_value(self.group),
            image: optional_value(self.image),
        })
    }
}

impl CommentDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn validate(self) -> Result<Self, DomainError> {
        Ok(Self {
            text: required_text("text", &self.text, "Enter the comment text.")?,
        })
    }
}

fn required_text(
    field: &'static str,
    value: &str,
    message: &'static str,
) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, message));
    }
    Ok(trimmed.to_string())
}

fn optional_value(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
