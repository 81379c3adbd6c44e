//! Page data: what each generated page shows, loaded from the repository

mod detail;
mod list;

pub use detail::{PostDetailPage, Section};
pub use list::PostListPage;

/// Result of resolving a page by slug
#[derive(Debug)]
pub enum PageOutcome<T> {
    Found(T),
    /// Terminal: render the not-found page
    NotFound,
}

impl<T> PageOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            PageOutcome::Found(page) => Some(page),
            PageOutcome::NotFound => None,
        }
    }
}
