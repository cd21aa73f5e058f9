//! Document tools used by crawlers.

pub mod get;
pub mod save;

pub use get::{DocumentGetParams, get_impl};
pub use save::{DocumentSaveParams, save_impl};
