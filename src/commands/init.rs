//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::Blog;

const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: pt-BR
# IANA zone used for publication dates, empty for UTC
timezone: ''

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public
static_dir: static

# Listing and reading
page_size: 1
words_per_minute: 200

# Content repository (PRISMIC_ENDPOINT / PRISMIC_ACCESS_TOKEN override these)
repository:
  endpoint: https://spacetraveling.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  timeout_secs: 10

# Seconds a generated page stays fresh
revalidate:
  index_secs: 1800
  post_secs: 3600

preview:
  cookie_name: spacetraveling.preview

# utterances widget, leave repo empty to disable
comments:
  repo: ''
  issue_term: pathname
  theme: github-dark
"#;

const DEFAULT_STYLE: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: #1a1d23; color: #d7d7d7; font-family: Inter, sans-serif; }
a { color: inherit; text-decoration: none; }
.container { max-width: 720px; margin: 0 auto; padding: 0 1rem 4rem; }
.header { max-width: 720px; margin: 0 auto; padding: 4rem 1rem 3rem; }
.logo { font-size: 1.5rem; font-weight: 700; color: #ff57b2; }
.post-card { display: block; margin-bottom: 3rem; }
.post-card strong { display: block; font-size: 1.75rem; color: #f8f8f8; }
.post-card p { margin: 0.5rem 0 1.5rem; font-size: 1.125rem; }
.info { display: flex; gap: 1.5rem; list-style: none; font-size: 0.875rem; color: #bbb; }
#load-more { background: none; border: 0; color: #ff57b2; font-size: 1.125rem; cursor: pointer; }
#load-more:disabled { opacity: 0.6; cursor: wait; }
.banner { width: 100%; max-height: 400px; object-fit: cover; margin-bottom: 5rem; }
.post h1 { font-size: 3rem; color: #f8f8f8; margin-bottom: 1.5rem; }
.edited { font-style: italic; font-size: 0.875rem; margin-top: 1rem; }
.content { margin-top: 4rem; }
.content h2 { font-size: 2.25rem; color: #f8f8f8; margin-bottom: 2rem; }
.content p { line-height: 1.8; margin-bottom: 1rem; }
.post-nav { display: flex; justify-content: space-between; border-top: 1px solid #333; margin-top: 4rem; padding-top: 3rem; }
.post-nav div:last-child { text-align: right; }
.post-nav span { display: block; color: #f8f8f8; }
.post-nav a { color: #ff57b2; }
.exit-preview { margin-top: 4rem; text-align: center; }
.exit-preview a { display: inline-block; padding: 1rem 2rem; background: #222; border-radius: 8px; }
.comments { margin-top: 4rem; }
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("static/css"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        tracing::warn!("Keeping existing {:?}", config_path);
    } else {
        fs::write(&config_path, DEFAULT_CONFIG)?;
    }

    let style_path = target_dir.join("static/css/style.css");
    if !style_path.exists() {
        fs::write(&style_path, DEFAULT_STYLE)?;
    }

    Ok(())
}

/// Run the init command with an existing Blog instance
pub fn run(blog: &Blog) -> Result<()> {
    init_site(&blog.base_dir)
}
