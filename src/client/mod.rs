//! Content repository client
//!
//! [`ContentRepository`] is the seam between pages and the headless content
//! API. Every call takes the content reference explicitly, so a preview
//! session is just a different [`ContentRef`] threaded through the same calls.

#[cfg(test)]
pub(crate) mod memory;
mod prismic;
mod query;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use prismic::PrismicClient;
pub use query::{Ordering, Predicate, Query};

use crate::content::{PostDetail, PostSummary, SearchResponse, SummaryData};
use crate::error::ContentError;
use crate::pagination::{LoadMore, PostListState};

/// Page size used when enumerating every document
pub const MAX_PAGE_SIZE: usize = 100;

/// Which content snapshot a query runs against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentRef {
    /// The published content
    #[default]
    Master,
    /// An unpublished snapshot identified by a preview token
    Preview(String),
}

impl ContentRef {
    pub fn from_preview(token: Option<String>) -> Self {
        match token {
            Some(token) if !token.is_empty() => ContentRef::Preview(token),
            _ => ContentRef::Master,
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, ContentRef::Preview(_))
    }
}

/// Opaque pointer to the next page of a listing, forwarded as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of post summaries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    pub next_page: Option<Cursor>,
}

impl From<SearchResponse<SummaryData>> for PostPage {
    fn from(response: SearchResponse<SummaryData>) -> Self {
        Self {
            results: response
                .results
                .into_iter()
                .map(PostSummary::from)
                .collect(),
            next_page: response.next_page.map(Cursor::new),
        }
    }
}

/// Neighbour of a post in publication order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Nearest post published before
    Prev,
    /// Nearest post published after
    Next,
}

/// Read access to the posts of a content repository
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// First page of posts, newest first
    async fn list_posts(
        &self,
        reference: &ContentRef,
        page_size: usize,
    ) -> Result<PostPage, ContentError>;

    /// The page a cursor points at
    async fn next_page(&self, cursor: &Cursor) -> Result<PostPage, ContentError>;

    async fn get_post_by_uid(
        &self,
        uid: &str,
        reference: &ContentRef,
    ) -> Result<Option<PostDetail>, ContentError>;

    async fn get_post_by_id(
        &self,
        id: &str,
        reference: &ContentRef,
    ) -> Result<Option<PostSummary>, ContentError>;

    /// Nearest post before or after the document `after_id`
    async fn adjacent_post(
        &self,
        after_id: &str,
        direction: Direction,
        reference: &ContentRef,
    ) -> Result<Option<PostSummary>, ContentError>;
}

/// Slugs of every post, walking all pages
pub async fn all_uids<R>(repo: &R, reference: &ContentRef) -> Result<Vec<String>, ContentError>
where
    R: ContentRepository + ?Sized,
{
    let first = repo.list_posts(reference, MAX_PAGE_SIZE).await?;
    let mut state = PostListState::new(first);
    while state.try_load_more(repo).await? != LoadMore::Disabled {}

    Ok(state
        .into_posts()
        .into_iter()
        .filter_map(|post| post.uid)
        .collect())
}
