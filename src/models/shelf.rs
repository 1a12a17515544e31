use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named tag/grouping to which books are added
///
/// Membership is a many-to-many relation carried in `book_shelves`, where each
/// (book, shelf) row has a count of how many catalog sources placed the book
/// on that shelf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Shelf {
    pub id: Uuid,
    pub name: String,
}

impl Shelf {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
        }
    }
}
