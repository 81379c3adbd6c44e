//! Generator module - renders pages from the content repository into static HTML

use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::{self, CacheDb};
use crate::client::{all_uids, ContentRef, ContentRepository};
use crate::helpers::post_path;
use crate::pages::{PageOutcome, PostDetailPage, PostListPage};
use crate::templates::TemplateRenderer;
use crate::Blog;

const INDEX_ROUTE: &str = "/";
const NOT_FOUND_ROUTE: &str = "/404";

/// What a generation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Pages rendered and written because their HTML changed
    pub written: usize,
    /// Pages rendered again with identical HTML
    pub unchanged: usize,
    /// Pages still inside their revalidation window
    pub fresh: usize,
    /// Post pages deleted because the post is gone
    pub removed: usize,
    /// Slugs listed by the repository that could not be resolved
    pub missing: usize,
}

impl GenerateReport {
    pub fn summary(&self) -> String {
        format!(
            "{} written, {} unchanged, {} fresh, {} removed",
            self.written, self.unchanged, self.fresh, self.removed
        )
    }
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            renderer: TemplateRenderer::new(&blog.config)?,
        })
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Render every stale page of the published site.
    ///
    /// With `force`, every page counts as stale.
    pub async fn generate<R>(
        &self,
        repo: &R,
        cache: &mut CacheDb,
        force: bool,
    ) -> Result<GenerateReport>
    where
        R: ContentRepository + ?Sized,
    {
        fs::create_dir_all(&self.blog.public_dir)?;
        self.copy_static_assets()?;

        let config_hash = cache::hash_file(&self.blog.base_dir.join("_config.yml"))?;
        if force || cache.config_hash != config_hash {
            cache.invalidate_all();
            cache.config_hash = config_hash;
        }

        let now = cache::now_secs();
        let revalidate = &self.blog.config.revalidate;
        let mut report = GenerateReport::default();

        // Listing
        if self.is_fresh(cache, INDEX_ROUTE, now, revalidate.index_secs) {
            report.fresh += 1;
        } else {
            let page =
                PostListPage::load(repo, &ContentRef::Master, self.blog.config.page_size).await?;
            let html = self.renderer.render_index(&page)?;
            self.store(cache, &mut report, INDEX_ROUTE, "index.html", &html, now)?;
        }

        // Not-found page
        if self.is_fresh(cache, NOT_FOUND_ROUTE, now, revalidate.post_secs) {
            report.fresh += 1;
        } else {
            let html = self.renderer.render_not_found(false)?;
            self.store(cache, &mut report, NOT_FOUND_ROUTE, "404.html", &html, now)?;
        }

        // Posts
        let uids = all_uids(repo, &ContentRef::Master).await?;
        tracing::info!("Repository lists {} posts", uids.len());

        let mut live = HashSet::new();
        for uid in &uids {
            let route = post_route(uid);
            live.insert(route.clone());

            if self.is_fresh(cache, &route, now, revalidate.post_secs) {
                report.fresh += 1;
                continue;
            }

            match self.render_post(repo, uid, &ContentRef::Master).await? {
                Some(html) => {
                    self.store(cache, &mut report, &route, &post_output(uid), &html, now)?;
                }
                None => {
                    tracing::warn!("Post {} is listed but could not be fetched", uid);
                    report.missing += 1;
                }
            }
        }

        // Posts that left the repository
        for route in cache.post_routes() {
            if live.contains(&route) {
                continue;
            }
            if let Some(entry) = cache.remove(&route) {
                self.remove_output(&entry.output_path)?;
                tracing::info!("Removed {}", route);
                report.removed += 1;
            }
        }

        Ok(report)
    }

    /// Render the page of one post, `None` when the slug is unknown
    pub async fn render_post<R>(
        &self,
        repo: &R,
        uid: &str,
        reference: &ContentRef,
    ) -> Result<Option<String>>
    where
        R: ContentRepository + ?Sized,
    {
        let outcome =
            PostDetailPage::load(repo, uid, reference, self.blog.config.reading_speed()).await?;
        match outcome {
            PageOutcome::Found(page) => Ok(Some(self.renderer.render_post(&page)?)),
            PageOutcome::NotFound => Ok(None),
        }
    }

    /// Render a post on first request and keep it on disk for the next one
    pub async fn render_fallback<R>(
        &self,
        repo: &R,
        cache: &mut CacheDb,
        uid: &str,
    ) -> Result<Option<String>>
    where
        R: ContentRepository + ?Sized,
    {
        let Some(html) = self.render_post(repo, uid, &ContentRef::Master).await? else {
            return Ok(None);
        };

        let mut report = GenerateReport::default();
        self.store(
            cache,
            &mut report,
            &post_route(uid),
            &post_output(uid),
            &html,
            cache::now_secs(),
        )?;
        tracing::info!("Rendered {} on demand", uid);
        Ok(Some(html))
    }

    /// Copy the static directory into the public directory
    pub fn copy_static_assets(&self) -> Result<usize> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files", copied);
        Ok(copied)
    }

    fn is_fresh(&self, cache: &CacheDb, route: &str, now: u64, max_age: u64) -> bool {
        cache.is_fresh(route, now, max_age)
            && cache
                .pages
                .get(route)
                .is_some_and(|entry| self.blog.public_dir.join(&entry.output_path).exists())
    }

    fn store(
        &self,
        cache: &mut CacheDb,
        report: &mut GenerateReport,
        route: &str,
        output: &str,
        html: &str,
        now: u64,
    ) -> Result<()> {
        let path = self.blog.public_dir.join(output);
        let changed = cache.record(route, html, output, now);
        if changed || !path.exists() {
            write_file(&path, html)?;
            report.written += 1;
        } else {
            report.unchanged += 1;
        }
        Ok(())
    }

    fn remove_output(&self, output: &str) -> Result<()> {
        let path = self.blog.public_dir.join(output);
        // Post pages live in their own directory
        let target = match path.parent() {
            Some(dir) if dir != self.blog.public_dir => dir.to_path_buf(),
            _ => path,
        };
        if target.is_dir() {
            fs::remove_dir_all(&target)
                .map_err(|e| anyhow::anyhow!("Failed to remove {:?}: {}", target, e))?;
        } else if target.exists() {
            fs::remove_file(&target)
                .map_err(|e| anyhow::anyhow!("Failed to remove {:?}: {}", target, e))?;
        }
        Ok(())
    }
}

/// Cache route of a post page
pub fn post_route(uid: &str) -> String {
    format!("/{}", post_path(uid))
}

fn post_output(uid: &str) -> String {
    format!("{}index.html", post_path(uid))
}

fn write_file(path: &Path, content: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, content).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    tracing::debug!("Generated: {:?}", path);
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::{post, InMemoryRepository};
    use tempfile::TempDir;

    fn blog(dir: &TempDir) -> Blog {
        Blog::new(dir.path()).unwrap()
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new(vec![
            post("first", "2021-03-20T10:00:00+0000", None),
            post("second", "2021-03-21T10:00:00+0000", None),
        ])
    }

    #[tokio::test]
    async fn test_generate_writes_every_page() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        fs::create_dir_all(blog.static_dir.join("css")).unwrap();
        fs::write(blog.static_dir.join("css/style.css"), "body {}").unwrap();

        let generator = Generator::new(&blog).unwrap();
        let mut cache = CacheDb::new();
        let report = generator
            .generate(&repo(), &mut cache, false)
            .await
            .unwrap();

        assert_eq!(report.written, 4);
        assert!(blog.public_dir.join("index.html").exists());
        assert!(blog.public_dir.join("404.html").exists());
        assert!(blog.public_dir.join("css/style.css").exists());

        let html = fs::read_to_string(blog.public_dir.join("post/second/index.html")).unwrap();
        assert!(html.contains("Title of second"));
        assert!(html.contains("Post anterior"));

        let index = fs::read_to_string(blog.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Title of second"));
        assert!(index.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_fresh_pages_are_not_refetched() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();
        let repo = repo();
        let mut cache = CacheDb::new();

        generator.generate(&repo, &mut cache, false).await.unwrap();
        let calls = repo.calls();

        let report = generator.generate(&repo, &mut cache, false).await.unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.fresh, 4);
        // Only the slug enumeration reaches the repository
        assert_eq!(repo.calls() - calls, 1);

        let report = generator.generate(&repo, &mut cache, true).await.unwrap();
        assert_eq!(report.fresh, 0);
        assert_eq!(report.unchanged, 4);
    }

    #[tokio::test]
    async fn test_removed_posts_are_deleted() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();
        let mut cache = CacheDb::new();

        generator
            .generate(&repo(), &mut cache, false)
            .await
            .unwrap();
        assert!(blog.public_dir.join("post/first/index.html").exists());

        let fewer = InMemoryRepository::new(vec![post("second", "2021-03-21T10:00:00+0000", None)]);
        let report = generator.generate(&fewer, &mut cache, true).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(!blog.public_dir.join("post/first").exists());
        assert!(blog.public_dir.join("post/second/index.html").exists());
    }

    #[tokio::test]
    async fn test_fallback_renders_unknown_slug_once() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();
        let mut cache = CacheDb::new();
        let repo = repo();

        let html = generator
            .render_fallback(&repo, &mut cache, "first")
            .await
            .unwrap()
            .unwrap();
        assert!(html.contains("Title of first"));
        assert!(blog.public_dir.join("post/first/index.html").exists());
        assert!(cache.pages.contains_key("/post/first/"));

        let missing = generator
            .render_fallback(&repo, &mut cache, "nope")
            .await
            .unwrap();
        assert!(missing.is_none());
        assert!(!blog.public_dir.join("post/nope").exists());
    }

    #[tokio::test]
    async fn test_repository_failure_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();
        let repo = repo();
        repo.fail_next(1);

        let mut cache = CacheDb::new();
        assert!(generator.generate(&repo, &mut cache, false).await.is_err());
    }
}
