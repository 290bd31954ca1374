use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugError, derive_slug, validate_slug};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("group slug `{slug}` is already taken")]
    Conflict { slug: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateGroupCommand {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_all().await?)
    }

    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title", "Group title must not be empty.").into());
        }

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => validate_slug(slug).map(str::to_string),
            _ => derive_slug(&title),
        }
        .map_err(slug_error)?;

        let group = self
            .writer
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::Conflict { slug },
                other => GroupError::Repo(other),
            })?;

        info!(
            target = "postboard::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }
}

fn slug_error(err: SlugError) -> GroupError {
    DomainError::validation("slug", err.to_string()).into()
}
