//! HTTP client for a Prismic v2 document API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

use super::query::{Ordering, Predicate, Query};
use super::{ContentRef, ContentRepository, Cursor, Direction, PostPage};
use crate::config::RepositoryConfig;
use crate::content::{PostData, PostDetail, PostSummary, SearchResponse, SummaryData};
use crate::error::ContentError;

/// How long a resolved master ref is reused
const MASTER_REF_TTL: Duration = Duration::from_secs(5);

const PUBLICATION_DATE: &str = "document.first_publication_date";

#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

/// Content repository backed by the Prismic REST API
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    document_type: String,
    master_ref: RwLock<Option<(String, Instant)>>,
}

impl PrismicClient {
    pub fn new(config: &RepositoryConfig) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: Url::parse(&config.endpoint)?,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            document_type: config.document_type.clone(),
            master_ref: RwLock::new(None),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ref string a query should run against
    async fn resolve(&self, reference: &ContentRef) -> Result<String, ContentError> {
        match reference {
            ContentRef::Preview(token) => Ok(token.clone()),
            ContentRef::Master => self.master_ref().await,
        }
    }

    async fn master_ref(&self) -> Result<String, ContentError> {
        if let Some((reference, fetched_at)) = self.master_ref.read().await.as_ref() {
            if fetched_at.elapsed() < MASTER_REF_TTL {
                return Ok(reference.clone());
            }
        }

        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        let root: ApiRoot = self.get_json(url).await?;
        let reference = root
            .refs
            .into_iter()
            .find(|r| r.is_master)
            .map(|r| r.reference)
            .ok_or(ContentError::MissingMasterRef)?;

        *self.master_ref.write().await = Some((reference.clone(), Instant::now()));
        tracing::debug!("Resolved master ref {}", reference);
        Ok(reference)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ContentError> {
        let shown = redact(&url);
        tracing::debug!("GET {}", shown);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                status: status.as_u16(),
                url: shown,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn search<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> Result<SearchResponse<T>, ContentError> {
        let url = query.to_url(&self.endpoint, self.access_token.as_deref())?;
        self.get_json(url).await
    }

    fn type_predicate(&self) -> Predicate {
        Predicate::at("document.type", self.document_type.as_str())
    }

    fn summary_fields(&self) -> Vec<String> {
        ["title", "subtitle", "author"]
            .iter()
            .map(|field| format!("{}.{}", self.document_type, field))
            .collect()
    }

    fn list_query(&self, reference: String, page_size: usize) -> Query {
        Query::new(reference)
            .predicate(self.type_predicate())
            .fetch(self.summary_fields())
            .page_size(page_size)
            .order_by(Ordering::desc(PUBLICATION_DATE))
    }

    fn uid_query(&self, reference: String, uid: &str) -> Query {
        Query::new(reference)
            .predicate(Predicate::at(format!("my.{}.uid", self.document_type), uid))
            .page_size(1)
    }

    fn id_query(&self, reference: String, id: &str) -> Query {
        Query::new(reference)
            .predicate(Predicate::at("document.id", id))
            .fetch(self.summary_fields())
            .page_size(1)
    }

    fn adjacent_query(&self, reference: String, after_id: &str, direction: Direction) -> Query {
        let ordering = match direction {
            Direction::Prev => Ordering::desc(PUBLICATION_DATE),
            Direction::Next => Ordering::asc(PUBLICATION_DATE),
        };
        Query::new(reference)
            .predicate(self.type_predicate())
            .fetch([format!("{}.title", self.document_type)])
            .page_size(1)
            .after(after_id)
            .order_by(ordering)
    }

    /// A cursor is only followed when it points back at the configured repository.
    /// Published cursors carry no access token; it is added back here.
    fn cursor_url(&self, cursor: &Cursor) -> Result<Url, ContentError> {
        let url = Url::parse(cursor.as_str())?;
        if url.origin() != self.endpoint.origin() {
            return Err(ContentError::ForeignCursor(redact(&url)));
        }
        let mut url = without_access_token(url);
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        Ok(url)
    }

    /// Page with a cursor that is safe to embed in public HTML
    fn page(&self, response: SearchResponse<SummaryData>) -> PostPage {
        let mut page = PostPage::from(response);
        page.next_page = page.next_page.map(public_cursor);
        page
    }
}

fn public_cursor(cursor: Cursor) -> Cursor {
    match Url::parse(cursor.as_str()) {
        Ok(url) => Cursor::new(without_access_token(url).to_string()),
        Err(_) => cursor,
    }
}

fn without_access_token(url: Url) -> Url {
    if !url.query_pairs().any(|(key, _)| key == "access_token") {
        return url;
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "access_token")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut clean = url;
    clean.set_query(None);
    if !pairs.is_empty() {
        clean.query_pairs_mut().extend_pairs(pairs);
    }
    clean
}

/// URL without its query string, so tokens never reach logs
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[async_trait]
impl ContentRepository for PrismicClient {
    async fn list_posts(
        &self,
        reference: &ContentRef,
        page_size: usize,
    ) -> Result<PostPage, ContentError> {
        let reference = self.resolve(reference).await?;
        let response: SearchResponse<SummaryData> =
            self.search(self.list_query(reference, page_size)).await?;
        Ok(self.page(response))
    }

    async fn next_page(&self, cursor: &Cursor) -> Result<PostPage, ContentError> {
        let url = self.cursor_url(cursor)?;
        let response: SearchResponse<SummaryData> = self.get_json(url).await?;
        Ok(self.page(response))
    }

    async fn get_post_by_uid(
        &self,
        uid: &str,
        reference: &ContentRef,
    ) -> Result<Option<PostDetail>, ContentError> {
        let reference = self.resolve(reference).await?;
        let response: SearchResponse<PostData> = self.search(self.uid_query(reference, uid)).await?;
        Ok(response
            .results
            .into_iter()
            .next()
            .map(|doc| PostDetail::from_document(doc, uid)))
    }

    async fn get_post_by_id(
        &self,
        id: &str,
        reference: &ContentRef,
    ) -> Result<Option<PostSummary>, ContentError> {
        let reference = self.resolve(reference).await?;
        let response: SearchResponse<SummaryData> =
            self.search(self.id_query(reference, id)).await?;
        Ok(response.results.into_iter().next().map(PostSummary::from))
    }

    async fn adjacent_post(
        &self,
        after_id: &str,
        direction: Direction,
        reference: &ContentRef,
    ) -> Result<Option<PostSummary>, ContentError> {
        let reference = self.resolve(reference).await?;
        let response: SearchResponse<SummaryData> = self
            .search(self.adjacent_query(reference, after_id, direction))
            .await?;
        Ok(response.results.into_iter().next().map(PostSummary::from))
    }
}
