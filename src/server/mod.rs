//! Site server
//!
//! Serves the generated site, renders preview sessions and unknown slugs on
//! demand, answers load-more requests and re-renders stale pages in the
//! background.

mod error;
mod preview;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Request, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use error::ServerError;
pub use preview::{clear_cookie, content_ref, get_cookie_value, start_cookie};

use crate::cache::CacheDb;
use crate::client::{ContentRef, ContentRepository, Cursor};
use crate::generator::{GenerateReport, Generator};
use crate::helpers::{post_path, url_for};
use crate::pages::PostListPage;
use crate::templates::PostCard;
use crate::Blog;

/// Shortest pause between two background revalidation passes
const MIN_REVALIDATE_SECS: u64 = 60;

/// Server options from the command line
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub ip: String,
    pub port: u16,
    pub open: bool,
    /// Re-render stale pages in the background
    pub revalidate: bool,
}

/// Server state shared by every handler
pub struct AppState {
    blog: Blog,
    generator: Generator,
    repo: Arc<dyn ContentRepository>,
    cache: Mutex<CacheDb>,
}

impl AppState {
    pub fn new(blog: &Blog, repo: Arc<dyn ContentRepository>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            generator: Generator::new(blog)?,
            repo,
            cache: Mutex::new(CacheDb::load(&blog.base_dir)),
        })
    }

    fn reference(&self, headers: &HeaderMap) -> ContentRef {
        content_ref(headers, &self.blog.config.preview.cookie_name)
    }

    fn root(&self) -> String {
        url_for(&self.blog.config, "")
    }

    fn not_found(&self, preview: bool) -> Result<Response, ServerError> {
        let html = self.generator.renderer().render_not_found(preview)?;
        Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
    }

    /// One generation pass over stale pages. The pass runs on a copy of the
    /// cache so on-demand renders are not blocked behind repository calls.
    pub async fn revalidate(&self) -> Result<GenerateReport> {
        let before = self.cache.lock().await.clone();
        let mut pass = before.clone();
        let result = self.generator.generate(&*self.repo, &mut pass, false).await;

        let mut cache = self.cache.lock().await;
        cache.merge_pass(&before, pass);
        cache.save(&self.blog.base_dir)?;
        result
    }
}

/// Start the server
pub async fn start(blog: &Blog, options: &ServerOptions) -> Result<()> {
    let repo: Arc<dyn ContentRepository> = Arc::new(blog.repository()?);
    let state = Arc::new(AppState::new(blog, repo)?);

    if options.revalidate {
        start_background_revalidation(state.clone());
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if options.ip == "localhost" {
        "127.0.0.1"
    } else {
        options.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port).parse()?;

    let url = format!(
        "http://{}:{}{}",
        options.ip,
        options.port,
        url_for(&blog.config, "")
    );
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if options.open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes, mounted under the configured root
pub fn router(state: Arc<AppState>) -> Router {
    let prefix = state.blog.config.root.trim_end_matches('/').to_string();

    let routes = Router::new()
        .route("/", get(index_handler))
        .route("/post/:uid", get(post_handler))
        .route("/post/:uid/", get(post_handler))
        .route("/api/posts", get(posts_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback(static_handler)
        .with_state(state);

    let app = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    };
    app.layer(TraceLayer::new_for_http())
}

/// Re-render stale pages on a fixed period
pub fn start_background_revalidation(state: Arc<AppState>) {
    let revalidate = &state.blog.config.revalidate;
    let period = revalidate
        .index_secs
        .min(revalidate.post_secs)
        .max(MIN_REVALIDATE_SECS);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(period));
        interval.tick().await; // Skip the first immediate tick

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled revalidation");

            match state.revalidate().await {
                Ok(report) => tracing::info!("Revalidation completed: {}", report.summary()),
                Err(e) => tracing::error!("Revalidation failed: {}", e),
            }
        }
    });
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let reference = state.reference(&headers);
    if !reference.is_preview() {
        let path = state.blog.public_dir.join("index.html");
        if let Ok(html) = tokio::fs::read_to_string(&path).await {
            return Ok(Html(html).into_response());
        }
    }

    let page = PostListPage::load(&*state.repo, &reference, state.blog.config.page_size).await?;
    let html = state.generator.renderer().render_index(&page)?;
    Ok(Html(html).into_response())
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let reference = state.reference(&headers);

    // Preview pages are never written to disk
    if reference.is_preview() {
        return match state
            .generator
            .render_post(&*state.repo, &uid, &reference)
            .await?
        {
            Some(html) => Ok(Html(html).into_response()),
            None => state.not_found(true),
        };
    }

    let path = state
        .blog
        .public_dir
        .join(post_path(&uid))
        .join("index.html");
    if let Ok(html) = tokio::fs::read_to_string(&path).await {
        return Ok(Html(html).into_response());
    }

    let rendered = {
        let mut cache = state.cache.lock().await;
        let rendered = state
            .generator
            .render_fallback(&*state.repo, &mut cache, &uid)
            .await?;
        cache.save(&state.blog.base_dir)?;
        rendered
    };

    match rendered {
        Some(html) => Ok(Html(html).into_response()),
        None => state.not_found(false),
    }
}

#[derive(Debug, Deserialize)]
struct PostsQuery {
    cursor: Option<String>,
}

/// A page of the listing as returned to the load-more button
#[derive(Debug, Serialize)]
struct PostsResponse {
    results: Vec<PostCard>,
    next_page: Option<Cursor>,
}

async fn posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<PostsResponse>, ServerError> {
    let cursor = query
        .cursor
        .filter(|c| !c.is_empty())
        .ok_or(ServerError::MissingParameter("cursor"))?;

    let page = state.repo.next_page(&Cursor::new(cursor)).await?;
    let renderer = state.generator.renderer();
    Ok(Json(PostsResponse {
        results: page
            .results
            .iter()
            .filter_map(|post| renderer.post_card(post))
            .collect(),
        next_page: page.next_page,
    }))
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Start a preview session and redirect to the previewed post
async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, ServerError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(ServerError::MissingParameter("token"))?;
    let reference = ContentRef::Preview(token.clone());

    let mut location = state.root();
    if let Some(id) = query.document_id.filter(|id| !id.is_empty()) {
        match state.repo.get_post_by_id(&id, &reference).await? {
            Some(post) => {
                if let Some(uid) = post.uid {
                    location = url_for(&state.blog.config, &post_path(&uid));
                }
            }
            None => tracing::warn!("Previewed document {} not found", id),
        }
    }

    tracing::info!("Preview session started, redirecting to {}", location);
    let cookie = start_cookie(
        &state.blog.config.preview.cookie_name,
        &token,
        &state.root(),
    );
    Ok(redirect_with_cookie(&location, &cookie))
}

async fn exit_preview_handler(State(state): State<Arc<AppState>>) -> Response {
    let cookie = clear_cookie(&state.blog.config.preview.cookie_name, &state.root());
    redirect_with_cookie(&state.root(), &cookie)
}

fn redirect_with_cookie(location: &str, cookie: &str) -> Response {
    let mut response = Redirect::temporary(location).into_response();
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().insert(SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid cookie header: {}", e),
    }
    response
}

/// Fallback handler that serves generated files
async fn static_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => state
            .not_found(false)
            .unwrap_or_else(IntoResponse::into_response),
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::{post, InMemoryRepository};
    use crate::client::ContentRepository;
    use serde_json::Value;
    use tempfile::TempDir;
    use url::Url;

    struct Fixture {
        base: String,
        repo: Arc<InMemoryRepository>,
        blog: Blog,
        http: reqwest::Client,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let repo = Arc::new(
            InMemoryRepository::new(vec![
                post("older", "2021-03-20T10:00:00+0000", None),
                post("newer", "2021-03-21T10:00:00+0000", None),
            ])
            .with_preview(
                "draft-ref",
                vec![
                    post("draft", "2021-03-22T10:00:00+0000", None),
                    post("newer", "2021-03-21T10:00:00+0000", None),
                ],
            ),
        );

        let shared: Arc<dyn ContentRepository> = repo.clone();
        let state = Arc::new(AppState::new(&blog, shared).unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Fixture {
            base,
            repo,
            blog,
            http,
            _dir: dir,
        }
    }

    impl Fixture {
        async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
            let mut request = self.http.get(format!("{}{}", self.base, path));
            if let Some(cookie) = cookie {
                request = request.header("cookie", cookie);
            }
            request.send().await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_load_more_endpoint() {
        let fx = fixture().await;
        let first = fx.repo.list_posts(&ContentRef::Master, 1).await.unwrap();
        let cursor = first.next_page.unwrap();

        let mut url = Url::parse(&format!("{}/api/posts", fx.base)).unwrap();
        url.query_pairs_mut().append_pair("cursor", cursor.as_str());
        let response = fx.http.get(url).send().await.unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
        assert_eq!(body["results"][0]["uid"], "older");
        assert_eq!(body["results"][0]["url"], "/post/older/");
        assert_eq!(body["results"][0]["date"], "20 mar 2021");
        assert!(body["next_page"].is_null());
    }

    #[tokio::test]
    async fn test_load_more_errors() {
        let fx = fixture().await;
        assert_eq!(fx.get("/api/posts", None).await.status(), 400);

        fx.repo.fail_next(1);
        let response = fx
            .get("/api/posts?cursor=memory%3A%2F%2Fposts%3Fpage%3D2", None)
            .await;
        assert_eq!(response.status(), 502);
    }

    #[tokio::test]
    async fn test_preview_session() {
        let fx = fixture().await;

        let response = fx
            .get("/api/preview?token=draft-ref&documentId=id-draft", None)
            .await;
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers()["location"], "/post/draft/");
        let cookie = response.headers()["set-cookie"]
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("spacetraveling.preview=draft%2Dref;"));

        let pair = cookie.split(';').next().unwrap();
        let page = fx.get("/post/draft/", Some(pair)).await;
        assert_eq!(page.status(), 200);
        let html = page.text().await.unwrap();
        assert!(html.contains("Title of draft"));
        assert!(html.contains("Sair do modo Preview"));
        // Preview renders stay off disk
        assert!(!fx.blog.public_dir.join("post/draft").exists());

        let index = fx.get("/", Some(pair)).await.text().await.unwrap();
        assert!(index.contains("Title of draft"));

        let response = fx.get("/api/exit-preview", Some(pair)).await;
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers()["location"], "/");
        let cleared = response.headers()["set-cookie"].to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_preview_requires_token() {
        let fx = fixture().await;
        assert_eq!(fx.get("/api/preview", None).await.status(), 400);

        let response = fx
            .get("/api/preview?token=draft-ref&documentId=gone", None)
            .await;
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers()["location"], "/");
    }

    #[tokio::test]
    async fn test_fallback_rendering_and_not_found() {
        let fx = fixture().await;

        let response = fx.get("/post/older/", None).await;
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("Title of older"));
        assert!(fx.blog.public_dir.join("post/older/index.html").exists());

        // The draft only exists in the preview snapshot
        let response = fx.get("/post/draft", None).await;
        assert_eq!(response.status(), 404);
        assert!(response.text().await.unwrap().contains("Post não encontrado"));

        assert_eq!(fx.get("/missing.css", None).await.status(), 404);
    }

    #[tokio::test]
    async fn test_revalidate_pass() {
        let fx = fixture().await;
        let shared: Arc<dyn ContentRepository> = fx.repo.clone();
        let state = AppState::new(&fx.blog, shared).unwrap();

        let report = state.revalidate().await.unwrap();
        assert_eq!(report.written, 4);
        assert!(fx.blog.public_dir.join("index.html").exists());
        assert_eq!(state.cache.lock().await.pages.len(), 4);

        // The pass result was merged back, so nothing is stale now
        let again = state.revalidate().await.unwrap();
        assert_eq!(again.fresh, 4);
        assert_eq!(again.written, 0);

        let index = fx.get("/", None).await.text().await.unwrap();
        assert!(index.contains("Title of newer"));
        assert!(!index.contains("Title of draft"));
    }
}
