//! Generate static files

use anyhow::Result;
use std::time::Instant;

use crate::cache::CacheDb;
use crate::client::ContentRepository;
use crate::generator::{GenerateReport, Generator};
use crate::Blog;

/// Generate the static site from the configured repository
pub async fn run(blog: &Blog, force: bool) -> Result<GenerateReport> {
    let repo = blog.repository()?;
    run_with_repository(blog, &repo, force).await
}

/// Generate with an explicit repository, keeping the cache on disk
pub async fn run_with_repository<R>(blog: &Blog, repo: &R, force: bool) -> Result<GenerateReport>
where
    R: ContentRepository + ?Sized,
{
    let start = Instant::now();

    let mut cache = CacheDb::load(&blog.base_dir);
    let generator = Generator::new(blog)?;

    let result = generator.generate(repo, &mut cache, force).await;
    // Pages written before a failure stay recorded
    cache.save(&blog.base_dir)?;
    let report = result?;

    tracing::info!(
        "Generated in {:.2}s ({})",
        start.elapsed().as_secs_f64(),
        report.summary()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::{post, InMemoryRepository};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cache_persists_between_runs() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let repo = InMemoryRepository::new(vec![post("hello", "2021-03-25T10:00:00+0000", None)]);

        let first = run_with_repository(&blog, &repo, false).await.unwrap();
        assert_eq!(first.written, 3);

        let second = run_with_repository(&blog, &repo, false).await.unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.fresh, 3);

        let forced = run_with_repository(&blog, &repo, true).await.unwrap();
        assert_eq!(forced.fresh, 0);
    }

    #[tokio::test]
    async fn test_config_change_makes_pages_stale() {
        let dir = TempDir::new().unwrap();
        let repo = InMemoryRepository::new(vec![post("hello", "2021-03-25T10:00:00+0000", None)]);

        let blog = Blog::new(dir.path()).unwrap();
        run_with_repository(&blog, &repo, false).await.unwrap();

        std::fs::write(dir.path().join("_config.yml"), "title: Renamed\n").unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let report = run_with_repository(&blog, &repo, false).await.unwrap();
        assert_eq!(report.fresh, 0);
        assert_eq!(report.written, 3);
    }
}
