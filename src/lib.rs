//! spacetraveling: a static blog generator backed by a headless content repository
//!
//! Posts are fetched from a Prismic-style document API, rendered with Tera
//! templates embedded in the binary and written to a public directory. A small
//! axum server serves the result, answers "load more" requests and renders
//! preview sessions on demand.

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pages;
pub mod pagination;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;

/// The main blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
    /// Static assets copied as-is into the public directory
    pub static_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env_overrides();

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        })
    }

    /// HTTP client for the configured content repository
    pub fn repository(&self) -> Result<client::PrismicClient> {
        Ok(client::PrismicClient::new(&self.config.repository)?)
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::run(self)
    }

    /// Generate the static site
    pub async fn generate(&self, force: bool) -> Result<generator::GenerateReport> {
        commands::generate::run(self, force).await
    }

    /// Clean the public directory and the cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
