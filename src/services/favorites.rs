use std::sync::Arc;
use uuid::Uuid;

use crate::{
    catalog::{CatalogQueries, FavoriteStore},
    error::{AppError, AppResult},
    models::{Favorite, FavoriteCreated},
    services::recommendations::{Recommender, DEFAULT_LIMIT},
};

/// Maximum favorites a single user may hold
pub const MAX_FAVORITES: usize = 20;

/// Manages per-user favorites and bundles fresh suggestions into each
/// successful creation
///
/// The recommender itself never writes; this service owns the only mutation
/// path into the favorite set.
pub struct FavoriteService {
    catalog: Arc<dyn CatalogQueries>,
    store: Arc<dyn FavoriteStore>,
    recommender: Recommender,
    max_favorites: usize,
    recommendation_limit: usize,
}

impl FavoriteService {
    pub fn new(catalog: Arc<dyn CatalogQueries>, store: Arc<dyn FavoriteStore>) -> Self {
        let recommender = Recommender::new(catalog.clone());
        Self {
            catalog,
            store,
            recommender,
            max_favorites: MAX_FAVORITES,
            recommendation_limit: DEFAULT_LIMIT,
        }
    }

    /// Overrides the favorites cap and suggestion count (see `Config`)
    pub fn with_limits(mut self, max_favorites: usize, recommendation_limit: usize) -> Self {
        self.max_favorites = max_favorites;
        self.recommendation_limit = recommendation_limit;
        self
    }

    /// Marks a book as a favorite and returns suggestions derived from the
    /// user's updated favorite set
    ///
    /// Rejects the call when the user already holds the maximum number of
    /// favorites, when the book does not exist, or when the (user, book)
    /// pair is already recorded.
    pub async fn favorite_book(&self, user_id: Uuid, book_id: Uuid) -> AppResult<FavoriteCreated> {
        let count = self.store.favorite_count(user_id).await?;
        if count >= self.max_favorites {
            return Err(AppError::InvalidInput(format!(
                "You can only have up to {} favorites",
                self.max_favorites
            )));
        }

        let books = self.catalog.books_by_id(&[book_id]).await?;
        if books.is_empty() {
            return Err(AppError::NotFound(format!("book {} not found", book_id)));
        }

        let favorite = self.store.add_favorite(user_id, book_id).await?;

        tracing::info!(
            user_id = %user_id,
            book_id = %book_id,
            favorites = count + 1,
            "Favorite created"
        );

        let recommendations = self
            .recommender
            .recommend(user_id, self.recommendation_limit)
            .await?;

        Ok(FavoriteCreated {
            favorite,
            recommendations,
        })
    }

    /// Removes a favorite; `NotFound` when the pair was never recorded
    pub async fn unfavorite_book(&self, user_id: Uuid, book_id: Uuid) -> AppResult<()> {
        self.store.remove_favorite(user_id, book_id).await?;
        tracing::info!(user_id = %user_id, book_id = %book_id, "Favorite removed");
        Ok(())
    }

    pub async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        self.store.list_favorites(user_id).await
    }
}
