//! Post models and the repository document shapes they are read from

use serde::{Deserialize, Deserializer, Serialize};

use super::RichText;

/// A repository document as returned by the search API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    /// Repository id, used for adjacency queries and preview redirects
    pub id: String,

    /// URL slug
    #[serde(default)]
    pub uid: Option<String>,

    /// Custom type of the document (`posts`)
    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    pub data: T,
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_results_size: u64,
    pub results: Vec<Document<T>>,
    /// Ready-made URL of the following page, absent on the last page
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Fields projected by the list query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
}

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: SummaryData,
}

impl From<Document<SummaryData>> for PostSummary {
    fn from(doc: Document<SummaryData>) -> Self {
        Self {
            id: doc.id,
            uid: doc.uid,
            first_publication_date: doc.first_publication_date,
            data: doc.data,
        }
    }
}

/// Full post data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
    #[serde(default, deserialize_with = "nullable")]
    pub banner: Banner,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Vec<ContentBlock>,
}

/// Banner image field, `{}` when no image was uploaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// One section of a post body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub body: RichText,
}

impl ContentBlock {
    pub fn heading(&self) -> &str {
        self.heading.as_deref().unwrap_or("")
    }
}

/// A post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub data: PostData,
}

impl PostDetail {
    /// Build from a document, falling back to `uid` when the document has none
    pub fn from_document(doc: Document<PostData>, uid: &str) -> Self {
        Self {
            id: doc.id,
            uid: doc.uid.unwrap_or_else(|| uid.to_string()),
            first_publication_date: doc.first_publication_date,
            last_publication_date: doc.last_publication_date,
            data: doc.data,
        }
    }

    /// Whether the post was republished after its first publication
    pub fn is_edited(&self) -> bool {
        self.first_publication_date != self.last_publication_date
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            uid: Some(self.uid.clone()),
            first_publication_date: self.first_publication_date.clone(),
            data: SummaryData {
                title: self.data.title.clone(),
                subtitle: self.data.subtitle.clone(),
                author: self.data.author.clone(),
            },
        }
    }
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
