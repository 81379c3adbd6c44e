//! Search query builder for the repository's document search endpoint

use url::Url;

/// A filter on documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals value, e.g. `[at(document.type,"posts")]`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    fn render(&self) -> String {
        match self {
            Predicate::At { path, value } => {
                format!(r#"[at({},"{}")]"#, path, value.replace('"', "\\\""))
            }
        }
    }
}

/// Sort key of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    field: String,
    descending: bool,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    fn render(&self) -> String {
        if self.descending {
            format!("{} desc", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// A document search against one content reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    reference: String,
    predicates: Vec<Predicate>,
    fetch: Vec<String>,
    page_size: Option<usize>,
    orderings: Vec<Ordering>,
    after: Option<String>,
}

impl Query {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            predicates: Vec::new(),
            fetch: Vec::new(),
            page_size: None,
            orderings: Vec::new(),
            after: None,
        }
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Restrict returned data to these fields (`posts.title`, ...)
    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    /// Only documents that come after this document id in the ordering
    pub fn after(mut self, document_id: impl Into<String>) -> Self {
        self.after = Some(document_id.into());
        self
    }

    /// Search URL under the repository endpoint
    pub fn to_url(
        &self,
        endpoint: &Url,
        access_token: Option<&str>,
    ) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!(
            "{}/documents/search",
            endpoint.as_str().trim_end_matches('/')
        ))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &self.reference);

            if !self.predicates.is_empty() {
                let q: String = self.predicates.iter().map(Predicate::render).collect();
                pairs.append_pair("q", &format!("[{}]", q));
            }
            if !self.fetch.is_empty() {
                pairs.append_pair("fetch", &self.fetch.join(","));
            }
            if let Some(page_size) = self.page_size {
                pairs.append_pair("pageSize", &page_size.to_string());
            }
            if !self.orderings.is_empty() {
                let orderings: Vec<String> = self.orderings.iter().map(Ordering::render).collect();
                pairs.append_pair("orderings", &format!("[{}]", orderings.join(",")));
            }
            if let Some(after) = &self.after {
                pairs.append_pair("after", after);
            }
            if let Some(token) = access_token {
                pairs.append_pair("access_token", token);
            }
        }

        Ok(url)
    }
}
