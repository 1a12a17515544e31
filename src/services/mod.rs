pub mod favorites;
pub mod recommendations;

pub use favorites::FavoriteService;
pub use recommendations::{Recommender, TasteProfile, DEFAULT_LIMIT};
