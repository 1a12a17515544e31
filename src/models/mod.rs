mod book;
mod favorite;
mod shelf;

pub use book::Book;
pub use favorite::{Favorite, FavoriteCreated};
pub use shelf::Shelf;
