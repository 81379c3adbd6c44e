//! Helper functions shared by the generator, templates and server

mod date;
mod url;

pub use self::date::*;
pub use self::url::*;
