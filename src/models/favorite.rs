use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Book;

/// A user's explicit marking of a book as liked
///
/// A user may favorite a given book at most once; the store enforces the
/// (user, book) uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Favorite {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: Uuid, book_id: Uuid) -> Self {
        Self {
            user_id,
            book_id,
            created_at: Utc::now(),
        }
    }
}

/// Result of creating a favorite: the stored record plus a fresh set of
/// suggestions derived from the user's updated favorite set
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteCreated {
    pub favorite: Favorite,
    pub recommendations: Vec<Book>,
}
