use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Book, Favorite};

use super::{CatalogQueries, FavoriteStore};

const BOOK_COLUMNS: &str =
    "id, title, author_id, author_name, series_id, language, average_rating, ratings_count";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Catalog query interface backed by PostgreSQL
///
/// Schema ownership (migrations, indexes) lives with the service that imports
/// the dataset; this type only reads `books`, `shelves`, `book_shelves` and
/// reads/writes `favorites`.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Strategy C row: a book plus how many of the popular shelves it sits on
#[derive(sqlx::FromRow)]
struct ShelfCandidateRow {
    #[sqlx(flatten)]
    book: Book,
    shelf_popularity: i64,
}

#[async_trait]
impl CatalogQueries for PgCatalog {
    async fn favorite_book_ids(&self, user_id: Uuid) -> AppResult<HashSet<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT book_id FROM favorites WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn books_by_id(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn shelves_ranked_by_membership(
        &self,
        book_ids: &[Uuid],
        top_n: usize,
    ) -> AppResult<Vec<Uuid>> {
        if book_ids.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let shelf_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT s.id
            FROM shelves s
            JOIN book_shelves bs ON bs.shelf_id = s.id
            WHERE bs.book_id = ANY($1)
            GROUP BY s.id
            ORDER BY COUNT(bs.book_id) DESC
            LIMIT $2
            "#,
        )
        .bind(book_ids)
        .bind(top_n as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(shelf_ids)
    }

    async fn books_by_author(
        &self,
        author_ids: &[String],
        exclude_ids: &[Uuid],
        languages: &[String],
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        if author_ids.is_empty() || languages.is_empty() {
            return Ok(Vec::new());
        }

        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {BOOK_COLUMNS}
            FROM books
            WHERE author_id = ANY($1)
              AND NOT (id = ANY($2))
              AND language = ANY($3)
            ORDER BY average_rating DESC NULLS LAST, ratings_count DESC NULLS LAST
            LIMIT $4
            "#
        ))
        .bind(author_ids)
        .bind(exclude_ids)
        .bind(languages)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn books_by_series(
        &self,
        series_ids: &[String],
        exclude_ids: &[Uuid],
        languages: &[String],
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        if series_ids.is_empty() || languages.is_empty() {
            return Ok(Vec::new());
        }

        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {BOOK_COLUMNS}
            FROM books
            WHERE series_id = ANY($1)
              AND NOT (id = ANY($2))
              AND language = ANY($3)
            ORDER BY average_rating DESC NULLS LAST, ratings_count DESC NULLS LAST
            LIMIT $4
            "#
        ))
        .bind(series_ids)
        .bind(exclude_ids)
        .bind(languages)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn books_on_shelves_with_popularity(
        &self,
        shelf_ids: &[Uuid],
        exclude_ids: &[Uuid],
        exclude_author_ids: &[String],
        languages: &[String],
        limit: usize,
    ) -> AppResult<Vec<(Book, i64)>> {
        if shelf_ids.is_empty() || languages.is_empty() {
            return Ok(Vec::new());
        }

        // The inner join against the popular shelf set guarantees every
        // returned row has at least one membership, so the score needs no
        // zero default.
        let rows = sqlx::query_as::<_, ShelfCandidateRow>(
            r#"
            SELECT b.id, b.title, b.author_id, b.author_name, b.series_id, b.language,
                   b.average_rating, b.ratings_count,
                   COUNT(bs.shelf_id) AS shelf_popularity
            FROM books b
            JOIN book_shelves bs ON bs.book_id = b.id AND bs.shelf_id = ANY($1)
            WHERE NOT (b.id = ANY($2))
              AND NOT (b.author_id = ANY($3))
              AND b.language = ANY($4)
            GROUP BY b.id, b.title, b.author_id, b.author_name, b.series_id, b.language,
                     b.average_rating, b.ratings_count
            ORDER BY shelf_popularity DESC,
                     b.average_rating DESC NULLS LAST,
                     b.ratings_count DESC NULLS LAST
            LIMIT $5
            "#,
        )
        .bind(shelf_ids)
        .bind(exclude_ids)
        .bind(exclude_author_ids)
        .bind(languages)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.book, row.shelf_popularity))
            .collect())
    }
}

#[async_trait]
impl FavoriteStore for PgCatalog {
    async fn favorite_count(&self, user_id: Uuid) -> AppResult<usize> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM favorites WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as usize)
    }

    async fn add_favorite(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Favorite> {
        let inserted = sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, book_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, book_id) DO NOTHING
            RETURNING user_id, book_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        inserted.ok_or_else(|| {
            AppError::InvalidInput("This book is already a favorite".to_string())
        })
    }

    async fn remove_favorite(&self, user_id: Uuid, book_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "favorite for book {} not found",
                book_id
            )));
        }

        Ok(())
    }

    async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        let favorites = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT user_id, book_id, created_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }
}
