//! Book catalog and recommendation core.
//!
//! Reads catalog snapshots (books, shelves, favorites) through the
//! [`catalog::CatalogQueries`] interface and derives capped, deduplicated
//! "you might like" lists from a user's favorites. Serving the results over
//! a protocol, importing the catalog, and owning the schema are the caller's
//! concerns.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
