use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{POSTS_PER_PAGE, Page, PageWindow};
use crate::application::repos::{FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo};
use crate::application::viewer::Viewer;
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error("authentication required")]
    Unauthorized,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    /// Every post by the author, regardless of the page shown.
    pub post_count: u64,
    /// Whether the viewer currently follows the author.
    pub following: bool,
    pub page: Page<PostRecord>,
}

/// Assembles the index, group, profile and follow feeds.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
        }
    }

    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostRecord>, FeedError> {
        self.paginate(PostFilter::All, page).await
    }

    pub async fn group(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;

        let page = self.paginate(PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        viewer: &Viewer,
        username: &str,
        page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownAuthor)?;

        let page = self.paginate(PostFilter::Author(author.id), page).await?;

        let following = match viewer.user_id() {
            Some(viewer_id) => self.follows.is_following(viewer_id, author.id).await?,
            None => false,
        };

        Ok(ProfileFeed {
            post_count: page.total_items,
            author,
            following,
            page,
        })
    }

    /// Posts by every author the viewer follows.
    pub async fn follow(
        &self,
        viewer: &Viewer,
        page: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        let viewer_id = viewer.user_id().ok_or(FeedError::Unauthorized)?;
        self.paginate(PostFilter::FollowedBy(viewer_id), page).await
    }

    async fn paginate(
        &self,
        filter: PostFilter,
        requested: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = PageWindow::resolve(total, POSTS_PER_PAGE, requested);
        let items = self.posts.list_posts(filter, window).await?;

        debug!(
            target = "postboard::feed",
            ?filter,
            page = window.number(),
            total_pages = window.total_pages(),
            items = items.len(),
            "assembled feed page"
        );

        Ok(Page::from_window(window, items))
    }
}
