//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::PreviewConfig;
pub use site::RepositoryConfig;
pub use site::RevalidateConfig;
pub use site::SiteConfig;
