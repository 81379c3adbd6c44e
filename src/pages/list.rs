use crate::client::{ContentRef, ContentRepository};
use crate::error::ContentError;
use crate::pagination::PostListState;

/// The post listing: the first page plus the cursor to extend it
#[derive(Debug, Clone)]
pub struct PostListPage {
    pub state: PostListState,
    pub preview: bool,
}

impl PostListPage {
    pub async fn load<R>(
        repo: &R,
        reference: &ContentRef,
        page_size: usize,
    ) -> Result<Self, ContentError>
    where
        R: ContentRepository + ?Sized,
    {
        let first = repo.list_posts(reference, page_size.max(1)).await?;
        tracing::debug!(
            "Listing starts with {} posts, more: {}",
            first.results.len(),
            first.next_page.is_some()
        );

        Ok(Self {
            state: PostListState::new(first),
            preview: reference.is_preview(),
        })
    }
}
