//! "Load more" pagination over an opaque cursor

use std::collections::HashSet;

use crate::client::{ContentRepository, Cursor, PostPage};
use crate::content::PostSummary;
use crate::error::ContentError;

/// Result of a load-more attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// No cursor left, or a load is already running
    Disabled,
    /// The next page was appended; holds the number of new posts
    Appended(usize),
    /// The fetch failed and the state is unchanged
    Failed,
}

/// Accumulated post list with the cursor of the page after it.
///
/// Posts only ever grow, and uids stay unique: a post the repository repeats
/// on a later page is dropped. `load_more` borrows the state mutably for the
/// whole fetch, so two loads can never overlap.
#[derive(Debug, Clone, Default)]
pub struct PostListState {
    posts: Vec<PostSummary>,
    seen: HashSet<String>,
    cursor: Option<Cursor>,
    loading: bool,
}

impl PostListState {
    /// State holding the first page
    pub fn new(first: PostPage) -> Self {
        let mut state = Self::default();
        state.apply(first);
        state
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_load_more(&self) -> bool {
        self.cursor.is_some() && !self.loading
    }

    /// Fetch the page behind the cursor and append it.
    ///
    /// Errors are returned with posts and cursor untouched, so the call can
    /// be retried.
    pub async fn try_load_more<R>(&mut self, repo: &R) -> Result<LoadMore, ContentError>
    where
        R: ContentRepository + ?Sized,
    {
        let Some(cursor) = self.begin_load() else {
            return Ok(LoadMore::Disabled);
        };

        let mut in_flight = InFlight { state: self };
        let page = repo.next_page(&cursor).await?;
        Ok(in_flight.state.apply(page))
    }

    /// Like [`try_load_more`](Self::try_load_more), logging failures instead of returning them
    pub async fn load_more<R>(&mut self, repo: &R) -> LoadMore
    where
        R: ContentRepository + ?Sized,
    {
        match self.try_load_more(repo).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Error loading posts: {}", e);
                LoadMore::Failed
            }
        }
    }

    pub fn into_posts(self) -> Vec<PostSummary> {
        self.posts
    }

    fn begin_load(&mut self) -> Option<Cursor> {
        if !self.can_load_more() {
            return None;
        }
        self.loading = true;
        self.cursor.clone()
    }

    /// Append a fetched page and take over its cursor
    fn apply(&mut self, page: PostPage) -> LoadMore {
        let before = self.posts.len();
        for post in page.results {
            if let Some(uid) = &post.uid {
                if !self.seen.insert(uid.clone()) {
                    tracing::warn!("Dropping repeated post {}", uid);
                    continue;
                }
            }
            self.posts.push(post);
        }
        self.cursor = page.next_page;
        self.loading = false;
        LoadMore::Appended(self.posts.len() - before)
    }
}

/// Clears `loading` when a fetch ends, including when its future is dropped
struct InFlight<'a> {
    state: &'a mut PostListState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.loading = false;
    }
}
