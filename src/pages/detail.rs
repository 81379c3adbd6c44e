use super::PageOutcome;
use crate::client::{ContentRef, ContentRepository, Direction};
use crate::content::metrics::reading_time;
use crate::content::{PostDetail, PostSummary};
use crate::error::ContentError;

/// One rendered section of a post body
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub html: String,
}

/// Everything a post page shows
#[derive(Debug, Clone)]
pub struct PostDetailPage {
    pub post: PostDetail,
    pub reading_minutes: usize,
    pub sections: Vec<Section>,
    /// Nearest older post
    pub prev_post: Option<PostSummary>,
    /// Nearest newer post
    pub next_post: Option<PostSummary>,
    pub preview: bool,
}

impl PostDetailPage {
    /// Resolve `slug` and its neighbours against `reference`.
    ///
    /// The neighbours are only looked up once the post exists.
    pub async fn load<R>(
        repo: &R,
        slug: &str,
        reference: &ContentRef,
        words_per_minute: usize,
    ) -> Result<PageOutcome<Self>, ContentError>
    where
        R: ContentRepository + ?Sized,
    {
        let Some(post) = repo.get_post_by_uid(slug, reference).await? else {
            tracing::debug!("No post with uid {}", slug);
            return Ok(PageOutcome::NotFound);
        };

        let prev_post = repo
            .adjacent_post(&post.id, Direction::Prev, reference)
            .await?;
        let next_post = repo
            .adjacent_post(&post.id, Direction::Next, reference)
            .await?;

        let reading_minutes = reading_time(&post.data.title, &post.data.content, words_per_minute);
        let sections = post
            .data
            .content
            .iter()
            .map(|block| Section {
                heading: block.heading().to_string(),
                html: block.body.as_html(),
            })
            .collect();

        Ok(PageOutcome::Found(Self {
            post,
            reading_minutes,
            sections,
            prev_post,
            next_post,
            preview: reference.is_preview(),
        }))
    }

    /// Whether the `*editado em` marker is shown
    pub fn edited(&self) -> bool {
        self.post.is_edited()
    }
}
