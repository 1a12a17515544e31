use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// A book in the catalog
///
/// Author and series are denormalized scalar identifiers carried on the book
/// itself, matching the upstream dataset. Rating fields are nullable because
/// not every imported record has been rated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Book {
    /// Unique identifier for the book
    pub id: Uuid,
    /// Title of the book
    pub title: String,
    /// Denormalized author identifier from the source dataset
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    /// Denormalized series identifier; not every book belongs to a series
    pub series_id: Option<String>,
    /// ISO-ish language code (e.g. "en", "eng")
    pub language: Option<String>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<i64>,
}

impl Book {
    /// Creates a new book with only the fields the recommender cares about
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            author_id: None,
            author_name: None,
            series_id: None,
            language: None,
            average_rating: None,
            ratings_count: None,
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    pub fn with_series(mut self, series_id: impl Into<String>) -> Self {
        self.series_id = Some(series_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_rating(mut self, average_rating: f64, ratings_count: i64) -> Self {
        self.average_rating = Some(average_rating);
        self.ratings_count = Some(ratings_count);
        self
    }
}

impl Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.author_name {
            Some(author) => write!(f, "{} ({})", self.title, author),
            None => write!(f, "{}", self.title),
        }
    }
}
