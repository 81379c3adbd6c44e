//! List the posts of the content repository

use anyhow::Result;

use crate::client::{ContentRef, ContentRepository, MAX_PAGE_SIZE};
use crate::helpers::format_pt_br_date;
use crate::pagination::{LoadMore, PostListState};
use crate::Blog;

/// Print every published post, newest first
pub async fn run(blog: &Blog) -> Result<()> {
    let repo = blog.repository()?;
    let lines = post_lines(&repo, &blog.config.tz()?).await?;

    println!("Posts ({}):", lines.len());
    for line in lines {
        println!("  {}", line);
    }
    Ok(())
}

/// One `date - title [uid]` line per post
pub async fn post_lines<R>(repo: &R, tz: &chrono_tz::Tz) -> Result<Vec<String>>
where
    R: ContentRepository + ?Sized,
{
    let first = repo.list_posts(&ContentRef::Master, MAX_PAGE_SIZE).await?;
    let mut state = PostListState::new(first);
    while state.try_load_more(repo).await? != LoadMore::Disabled {}

    Ok(state
        .posts()
        .iter()
        .map(|post| {
            format!(
                "{} - {} [{}]",
                format_pt_br_date(post.first_publication_date.as_deref(), tz),
                post.data.title,
                post.uid.as_deref().unwrap_or("-")
            )
        })
        .collect())
}
