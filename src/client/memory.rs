//! In-memory repository used by tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use super::{ContentRef, ContentRepository, Cursor, Direction, PostPage};
use crate::content::rich_text::{Block, TextBlock};
use crate::content::{ContentBlock, PostData, PostDetail, PostSummary, RichText};
use crate::error::ContentError;

/// Build a post with a title derived from its uid and one paragraph
pub(crate) fn post(uid: &str, first: &str, last: Option<&str>) -> PostDetail {
    PostDetail {
        id: format!("id-{uid}"),
        uid: uid.to_string(),
        first_publication_date: Some(first.to_string()),
        last_publication_date: Some(last.unwrap_or(first).to_string()),
        data: PostData {
            title: format!("Title of {uid}"),
            subtitle: format!("Subtitle of {uid}"),
            author: "Joseph Oliveira".to_string(),
            banner: Default::default(),
            content: vec![ContentBlock {
                heading: Some("Section".to_string()),
                body: RichText(vec![Block::Paragraph(TextBlock {
                    text: "Lorem ipsum dolor sit amet".to_string(),
                    spans: Vec::new(),
                })]),
            }],
        },
    }
}

/// Posts held in memory, newest first, with paging cursors of the form
/// `memory://posts?ref=<ref>&page=<n>&pageSize=<size>`
pub(crate) struct InMemoryRepository {
    master: Vec<PostDetail>,
    previews: HashMap<String, Vec<PostDetail>>,
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new(posts: Vec<PostDetail>) -> Self {
        Self {
            master: sorted(posts),
            previews: HashMap::new(),
            calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Add a preview snapshot reachable with `token`
    pub fn with_preview(mut self, token: &str, posts: Vec<PostDetail>) -> Self {
        self.previews.insert(token.to_string(), sorted(posts));
        self
    }

    /// Make the next `n` calls fail
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Number of repository calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ContentError::Status {
                status: 503,
                url: "memory://posts".to_string(),
            });
        }
        Ok(())
    }

    fn snapshot(&self, reference: &ContentRef) -> &[PostDetail] {
        match reference {
            ContentRef::Master => &self.master,
            ContentRef::Preview(token) => self
                .previews
                .get(token)
                .map(Vec::as_slice)
                .unwrap_or(self.master.as_slice()),
        }
    }

    fn page(&self, reference: &ContentRef, page: usize, page_size: usize) -> PostPage {
        let posts = self.snapshot(reference);
        let page_size = page_size.max(1);
        let start = (page - 1) * page_size;
        let results = posts
            .iter()
            .skip(start)
            .take(page_size)
            .map(PostDetail::summary)
            .collect();

        let next_page = (start + page_size < posts.len()).then(|| {
            let reference = match reference {
                ContentRef::Master => "master",
                ContentRef::Preview(token) => token.as_str(),
            };
            Cursor::new(format!(
                "memory://posts?ref={}&page={}&pageSize={}",
                reference,
                page + 1,
                page_size
            ))
        });

        PostPage { results, next_page }
    }
}

fn sorted(mut posts: Vec<PostDetail>) -> Vec<PostDetail> {
    posts.sort_by(|a, b| b.first_publication_date.cmp(&a.first_publication_date));
    posts
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn list_posts(
        &self,
        reference: &ContentRef,
        page_size: usize,
    ) -> Result<PostPage, ContentError> {
        self.enter()?;
        Ok(self.page(reference, 1, page_size))
    }

    async fn next_page(&self, cursor: &Cursor) -> Result<PostPage, ContentError> {
        self.enter()?;
        let url = Url::parse(cursor.as_str())?;
        if url.scheme() != "memory" {
            return Err(ContentError::ForeignCursor(cursor.to_string()));
        }

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        let reference = match params.get("ref").map(String::as_str) {
            None | Some("master") => ContentRef::Master,
            Some(token) => ContentRef::Preview(token.to_string()),
        };
        let page = params
            .get("page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1usize)
            .max(1);
        let page_size = params
            .get("pageSize")
            .and_then(|p| p.parse().ok())
            .unwrap_or(20);

        Ok(self.page(&reference, page, page_size))
    }

    async fn get_post_by_uid(
        &self,
        uid: &str,
        reference: &ContentRef,
    ) -> Result<Option<PostDetail>, ContentError> {
        self.enter()?;
        Ok(self
            .snapshot(reference)
            .iter()
            .find(|post| post.uid == uid)
            .cloned())
    }

    async fn get_post_by_id(
        &self,
        id: &str,
        reference: &ContentRef,
    ) -> Result<Option<PostSummary>, ContentError> {
        self.enter()?;
        Ok(self
            .snapshot(reference)
            .iter()
            .find(|post| post.id == id)
            .map(PostDetail::summary))
    }

    async fn adjacent_post(
        &self,
        after_id: &str,
        direction: Direction,
        reference: &ContentRef,
    ) -> Result<Option<PostSummary>, ContentError> {
        self.enter()?;
        let posts = self.snapshot(reference);
        let Some(index) = posts.iter().position(|post| post.id == after_id) else {
            return Ok(None);
        };

        let neighbour = match direction {
            Direction::Prev => posts.get(index + 1),
            Direction::Next => index.checked_sub(1).and_then(|i| posts.get(i)),
        };
        Ok(neighbour.map(PostDetail::summary))
    }
}
