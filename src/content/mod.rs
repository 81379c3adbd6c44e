//! Content module - post models, rich text and reading metrics

pub mod metrics;
mod post;
pub mod rich_text;

pub use post::{
    Banner, ContentBlock, Document, PostData, PostDetail, PostSummary, SearchResponse, SummaryData,
};
pub use rich_text::RichText;
