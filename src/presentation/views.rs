use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year], [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(detail: &str) -> Response {
    let template = ErrorTemplate {
        status: StatusCode::NOT_FOUND.as_u16(),
        message: "The page you are looking for does not exist.".to_string(),
    };
    let mut response = render_template_response(template, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

fn format_timestamp(value: OffsetDateTime) -> String {
    value.format(DATE_FORMAT).unwrap_or_default()
}

#[derive(Clone)]
pub struct GroupLink {
    pub slug: String,
    pub title: String,
}

/// A post as shown in any feed or on its detail page.
#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub label: String,
    pub author_username: String,
    pub pub_date: String,
    pub group: Option<GroupLink>,
    pub image: Option<String>,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            label: post.label(),
            author_username: post.author.username.clone(),
            pub_date: format_timestamp(post.pub_date),
            group: post.group.as_ref().map(|group| GroupLink {
                slug: group.slug.clone(),
                title: group.title.clone(),
            }),
            image: post.image.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub created: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author.username.clone(),
            text: comment.text.clone(),
            created: format_timestamp(comment.created),
        }
    }
}

#[derive(Clone, Copy)]
pub struct PaginatorView {
    pub number: u32,
    pub total_pages: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl PaginatorView {
    pub fn is_paginated(&self) -> bool {
        self.total_pages > 1
    }
}

/// Cards and paginator for one page of a feed.
#[derive(Clone)]
pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl From<&Page<PostRecord>> for FeedView {
    fn from(page: &Page<PostRecord>) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView {
                number: page.number,
                total_pages: page.total_pages,
                previous: page.previous_number(),
                next: page.next_number(),
            },
        }
    }
}

/// Shared by every route and therefore free of viewer-specific content.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub group: GroupRecord,
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub following: bool,
    /// Authenticated and not looking at their own profile.
    pub can_follow: bool,
    pub feed: FeedView,
}

impl ProfileTemplate {
    pub fn new(
        author: &UserRecord,
        post_count: u64,
        following: bool,
        can_follow: bool,
        page: &Page<PostRecord>,
    ) -> Self {
        Self {
            username: author.username.clone(),
            display_name: author.display_name(),
            post_count,
            following,
            can_follow,
            feed: FeedView::from(page),
        }
    }
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub post: PostCard,
    pub post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
    pub comment_text: String,
    pub comment_error: Option<String>,
}

#[derive(Clone)]
pub struct GroupOption {
    pub slug: String,
    pub title: String,
    pub selected: bool,
}

/// Create and edit form, echoing back whatever the author submitted.
#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub image: String,
    pub groups: Vec<GroupOption>,
    pub error: Option<String>,
}

impl PostFormTemplate {
    pub fn new(
        edit_of: Option<i64>,
        text: &str,
        group: Option<&str>,
        image: Option<&str>,
        groups: &[GroupRecord],
    ) -> Self {
        let action = match edit_of {
            Some(id) => format!("/posts/{id}/edit/"),
            None => "/create/".to_string(),
        };
        Self {
            is_edit: edit_of.is_some(),
            action,
            text: text.to_string(),
            image: image.unwrap_or_default().to_string(),
            groups: groups
                .iter()
                .map(|g| GroupOption {
                    slug: g.slug.clone(),
                    title: g.title.clone(),
                    selected: group == Some(g.slug.as_str()),
                })
                .collect(),
            error: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}
