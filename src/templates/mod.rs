//! Built-in theme templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is off, templates
//! escape repository text explicitly and insert rendered rich text as-is.

use anyhow::Result;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::{CommentsConfig, SiteConfig};
use crate::content::PostSummary;
use crate::helpers::{format_pt_br_date, full_url_for, post_path, url_for};
use crate::pages::{PostDetailPage, PostListPage};

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteConfig,
    config: ConfigData,
    tz: Tz,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let tz = site.tz()?;
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/comments.html",
                include_str!("theme/partials/comments.html"),
            ),
        ])?;

        tera.register_filter(
            "pt_br_date",
            move |value: &tera::Value,
                  _args: &HashMap<String, tera::Value>|
                  -> tera::Result<tera::Value> {
                Ok(tera::Value::String(format_pt_br_date(value.as_str(), &tz)))
            },
        );

        Ok(Self {
            tera,
            site: site.clone(),
            config: ConfigData::from(site),
            tz,
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Listing card of a post; posts without a slug cannot be linked and get none
    pub fn post_card(&self, post: &PostSummary) -> Option<PostCard> {
        let uid = post.uid.as_deref()?;
        Some(PostCard {
            uid: uid.to_string(),
            url: url_for(&self.site, &post_path(uid)),
            date: format_pt_br_date(post.first_publication_date.as_deref(), &self.tz),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
        })
    }

    pub fn render_index(&self, page: &PostListPage) -> Result<String> {
        let posts: Vec<PostCard> = page
            .state
            .posts()
            .iter()
            .filter_map(|post| self.post_card(post))
            .collect();

        let mut context = self.base_context(page.preview);
        context.insert("posts", &posts);
        context.insert("next_page", &page.state.cursor().map(|c| c.as_str()));
        context.insert("api_url", &url_for(&self.site, "api/posts"));
        self.render("index.html", &context)
    }

    pub fn render_post(&self, page: &PostDetailPage) -> Result<String> {
        let post = &page.post;
        let data = PostPageData {
            uid: post.uid.clone(),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            banner_url: post.data.banner.url.clone(),
            banner_alt: post.data.banner.alt.clone().unwrap_or_default(),
            first_publication_date: post.first_publication_date.clone(),
            last_publication_date: post.last_publication_date.clone(),
            edited: page.edited(),
            reading_minutes: page.reading_minutes,
            sections: page
                .sections
                .iter()
                .map(|s| SectionData {
                    heading: s.heading.clone(),
                    html: s.html.clone(),
                })
                .collect(),
        };

        let canonical = full_url_for(&self.site, &post_path(&post.uid));
        let prev_post = page.prev_post.as_ref().and_then(|p| self.nav(p));
        let next_post = page.next_post.as_ref().and_then(|p| self.nav(p));

        let mut context = self.base_context(page.preview);
        context.insert("canonical", &canonical);
        context.insert("post", &data);
        context.insert("prev_post", &prev_post);
        context.insert("next_post", &next_post);
        self.render("post.html", &context)
    }

    pub fn render_not_found(&self, preview: bool) -> Result<String> {
        self.render("not_found.html", &self.base_context(preview))
    }

    fn nav(&self, post: &PostSummary) -> Option<NavPost> {
        let uid = post.uid.as_deref()?;
        Some(NavPost {
            title: post.data.title.clone(),
            url: url_for(&self.site, &post_path(uid)),
        })
    }

    fn base_context(&self, preview: bool) -> Context {
        let mut context = Context::new();
        context.insert("config", &self.config);
        context.insert("preview", &preview);
        context.insert("canonical", &None::<String>);
        context
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub comments: CommentsConfig,
}

impl From<&SiteConfig> for ConfigData {
    fn from(site: &SiteConfig) -> Self {
        Self {
            title: site.title.clone(),
            description: site.description.clone(),
            language: site.language.clone(),
            url: site.url.clone(),
            root: url_for(site, ""),
            comments: site.comments.clone(),
        }
    }
}

/// A post as listed on the index page and returned by the load-more endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub uid: String,
    pub url: String,
    /// Already formatted first publication date
    pub date: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
struct PostPageData {
    uid: String,
    title: String,
    subtitle: String,
    author: String,
    banner_url: Option<String>,
    banner_alt: String,
    first_publication_date: Option<String>,
    last_publication_date: Option<String>,
    edited: bool,
    reading_minutes: usize,
    sections: Vec<SectionData>,
}
