mod postgres;

pub use postgres::{create_pool, PgCatalog};

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Book, Favorite};

/// Read-only query surface over the book catalog
///
/// Every recommendation query is expressed here so the engine itself stays a
/// pure computation over snapshots. Candidate queries return rows already
/// ordered by their ranking keys; the engine only merges and filters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogQueries: Send + Sync {
    /// Ids of all books the user has favorited
    async fn favorite_book_ids(&self, user_id: Uuid) -> AppResult<HashSet<Uuid>>;

    /// Resolves a set of book ids to full records (unknown ids are skipped)
    async fn books_by_id(&self, ids: &[Uuid]) -> AppResult<Vec<Book>>;

    /// Shelf ids ordered by how many of the given books sit on each shelf,
    /// descending, truncated to `top_n`
    async fn shelves_ranked_by_membership(
        &self,
        book_ids: &[Uuid],
        top_n: usize,
    ) -> AppResult<Vec<Uuid>>;

    /// Books by any of the given authors, minus `exclude_ids`, restricted to
    /// `languages`, ordered by (average rating desc, ratings count desc)
    async fn books_by_author(
        &self,
        author_ids: &[String],
        exclude_ids: &[Uuid],
        languages: &[String],
        limit: usize,
    ) -> AppResult<Vec<Book>>;

    /// Same shape as [`Self::books_by_author`] but keyed on series
    async fn books_by_series(
        &self,
        series_ids: &[String],
        exclude_ids: &[Uuid],
        languages: &[String],
        limit: usize,
    ) -> AppResult<Vec<Book>>;

    /// Books on any of the given shelves with their shelf-popularity score
    /// (how many of the given shelves each book sits on), minus `exclude_ids`
    /// and minus books by `exclude_author_ids`, restricted to `languages`,
    /// ordered by (score desc, average rating desc, ratings count desc)
    async fn books_on_shelves_with_popularity(
        &self,
        shelf_ids: &[Uuid],
        exclude_ids: &[Uuid],
        exclude_author_ids: &[String],
        languages: &[String],
        limit: usize,
    ) -> AppResult<Vec<(Book, i64)>>;
}

/// Write surface for per-user favorites
///
/// Consumed by the favorites service, never by the recommender; the engine
/// only reads snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn favorite_count(&self, user_id: Uuid) -> AppResult<usize>;

    /// Records a favorite; rejects a (user, book) pair that already exists
    async fn add_favorite(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Favorite>;

    /// Removes a favorite; `NotFound` when the pair does not exist
    async fn remove_favorite(&self, user_id: Uuid, book_id: Uuid) -> AppResult<()>;

    async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Favorite>>;
}
