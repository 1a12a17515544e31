use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    catalog::CatalogQueries,
    error::{AppError, AppResult},
    models::Book,
};

/// Number of suggestions returned when the caller does not choose a limit
pub const DEFAULT_LIMIT: usize = 5;

/// How many top shelves define the user's taste cluster
const TOP_SHELVES: usize = 20;

/// Candidates taken from each of the author and series strategies
const STRATEGY_PICKS: usize = 1;

/// Ranked candidate pool fetched for the shelf-popularity strategy before the
/// distinct-author scan
const SHELF_CANDIDATE_POOL: usize = 20;

/// Distinct attributes of a user's favorite books
///
/// These sets gate all candidate generation: a candidate is eligible only if
/// its language appears among the favorite languages. Books missing an
/// attribute contribute nothing to the corresponding set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasteProfile {
    pub author_ids: Vec<String>,
    pub series_ids: Vec<String>,
    pub languages: Vec<String>,
}

impl TasteProfile {
    /// Derives the distinct author/series/language sets from a favorite
    /// snapshot
    pub fn from_books(books: &[Book]) -> Self {
        let mut author_ids: Vec<String> = books
            .iter()
            .filter_map(|b| b.author_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut series_ids: Vec<String> = books
            .iter()
            .filter_map(|b| b.series_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut languages: Vec<String> = books
            .iter()
            .filter_map(|b| b.language.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        // Deterministic order for stable queries and tests
        author_ids.sort();
        series_ids.sort();
        languages.sort();

        Self {
            author_ids,
            series_ids,
            languages,
        }
    }
}

/// Derives "you might like" suggestions from a user's favorite books
///
/// Three independent candidate strategies run against the catalog: books by
/// the same authors, books in the same series, and books popular on the
/// shelves the favorites cluster on. Results merge in that precedence order,
/// deduplicated by book id, capped at the requested limit.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn CatalogQueries>,
}

impl Recommender {
    pub fn new(catalog: Arc<dyn CatalogQueries>) -> Self {
        Self { catalog }
    }

    /// Produces at most `limit` suggested books for the user
    ///
    /// Never contains a book the user already favorited, never repeats an id,
    /// and degrades to a shorter (possibly empty) list under sparse data. A
    /// user with no favorites gets an empty list.
    pub async fn recommend(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<Book>> {
        if limit == 0 {
            return Err(AppError::InvalidInput(
                "recommendation limit must be greater than zero".to_string(),
            ));
        }

        // 1. Resolve the favorite set; nothing favorited means nothing to go on
        let favorite_ids: Vec<Uuid> = self
            .catalog
            .favorite_book_ids(user_id)
            .await?
            .into_iter()
            .collect();

        if favorite_ids.is_empty() {
            tracing::debug!(user_id = %user_id, "No favorites, skipping recommendation");
            return Ok(Vec::new());
        }

        // 2. Derive the taste profile from the favorite snapshot
        let favorites = self.catalog.books_by_id(&favorite_ids).await?;
        let profile = TasteProfile::from_books(&favorites);

        if profile.languages.is_empty() {
            tracing::warn!(
                user_id = %user_id,
                favorites = favorites.len(),
                "Favorites carry no language, all strategies gate to empty"
            );
        }

        tracing::debug!(
            user_id = %user_id,
            favorites = favorites.len(),
            authors = profile.author_ids.len(),
            series = profile.series_ids.len(),
            languages = profile.languages.len(),
            "Taste profile derived"
        );

        // 3. Run the candidate strategies. Author and series queries are
        //    independent; the shelf strategy first needs the taste-cluster
        //    shelf ranking.
        let (by_author, by_series, shelf_candidates) = tokio::try_join!(
            self.catalog.books_by_author(
                &profile.author_ids,
                &favorite_ids,
                &profile.languages,
                STRATEGY_PICKS,
            ),
            self.catalog.books_by_series(
                &profile.series_ids,
                &favorite_ids,
                &profile.languages,
                STRATEGY_PICKS,
            ),
            async {
                let shelves = self
                    .catalog
                    .shelves_ranked_by_membership(&favorite_ids, TOP_SHELVES)
                    .await?;
                self.catalog
                    .books_on_shelves_with_popularity(
                        &shelves,
                        &favorite_ids,
                        &profile.author_ids,
                        &profile.languages,
                        SHELF_CANDIDATE_POOL,
                    )
                    .await
            },
        )?;

        tracing::debug!(
            by_author = by_author.len(),
            by_series = by_series.len(),
            by_shelves = shelf_candidates.len(),
            "Candidates generated"
        );

        // 4. The shelf strategy surfaces new authors, one book per author
        let by_shelves = diversify_by_author(shelf_candidates, limit);

        // 5. Merge in precedence order, dedupe by id, cap
        let recommendations = merge_unique(
            by_author.into_iter().chain(by_series).chain(by_shelves),
            limit,
        );

        tracing::info!(
            user_id = %user_id,
            count = recommendations.len(),
            limit,
            "Recommendations generated"
        );

        Ok(recommendations)
    }
}

/// Greedy scan keeping the first-ranked book per distinct author
///
/// The candidate list arrives ordered by (shelf popularity, rating, ratings
/// count), so "first per author" is also "best per author". Stops once
/// `limit` diverse picks are collected.
fn diversify_by_author(candidates: Vec<(Book, i64)>, limit: usize) -> Vec<Book> {
    let mut seen_authors: HashSet<String> = HashSet::new();
    let mut picked = Vec::new();

    for (book, _score) in candidates {
        if let Some(author_id) = &book.author_id {
            if !seen_authors.insert(author_id.clone()) {
                continue;
            }
        }
        picked.push(book);
        if picked.len() >= limit {
            break;
        }
    }

    picked
}

/// First-seen-wins merge across the ordered strategy outputs
fn merge_unique(candidates: impl IntoIterator<Item = Book>, limit: usize) -> Vec<Book> {
    let mut seen_ids: HashSet<Uuid> = HashSet::new();
    let mut merged = Vec::new();

    for book in candidates {
        if !seen_ids.insert(book.id) {
            continue;
        }
        merged.push(book);
        if merged.len() >= limit {
            break;
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockCatalogQueries;
    use std::collections::HashSet;

    fn book(title: &str, author: &str, language: &str, rating: f64) -> Book {
        Book::new(title.to_string())
            .with_author(author)
            .with_language(language)
            .with_rating(rating, 100)
    }

    #[test]
    fn test_taste_profile_distinct_and_sorted() {
        let books = vec![
            book("A", "x", "en", 4.0),
            book("B", "x", "en", 3.0).with_series("s1"),
            book("C", "y", "fr", 5.0),
        ];

        let profile = TasteProfile::from_books(&books);
        assert_eq!(profile.author_ids, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(profile.series_ids, vec!["s1".to_string()]);
        assert_eq!(profile.languages, vec!["en".to_string(), "fr".to_string()]);
    }

    #[test]
    fn test_taste_profile_skips_missing_attributes() {
        let books = vec![Book::new("untagged".to_string())];
        let profile = TasteProfile::from_books(&books);
        assert!(profile.author_ids.is_empty());
        assert!(profile.series_ids.is_empty());
        assert!(profile.languages.is_empty());
    }

    #[test]
    fn test_diversify_keeps_first_book_per_author() {
        let candidates = vec![
            (book("first-by-x", "x", "en", 4.9), 10),
            (book("second-by-x", "x", "en", 4.8), 9),
            (book("first-by-y", "y", "en", 4.7), 8),
        ];

        let picked = diversify_by_author(candidates, 5);
        let titles: Vec<&str> = picked.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["first-by-x", "first-by-y"]);
    }

    #[test]
    fn test_diversify_stops_at_limit() {
        let candidates = vec![
            (book("a", "x", "en", 4.9), 10),
            (book("b", "y", "en", 4.8), 9),
            (book("c", "z", "en", 4.7), 8),
        ];

        let picked = diversify_by_author(candidates, 2);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_merge_dedupes_first_seen_wins() {
        let b1 = book("dup", "x", "en", 4.5);
        let mut b1_again = b1.clone();
        b1_again.title = "dup-under-other-strategy".to_string();
        let b2 = book("other", "y", "en", 4.0);

        let merged = merge_unique(vec![b1.clone(), b1_again, b2], 5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "dup");
    }

    #[test]
    fn test_merge_caps_at_limit() {
        let books: Vec<Book> = (0..10).map(|i| book(&format!("b{}", i), "x", "en", 4.0)).collect();
        let merged = merge_unique(books, 3);
        assert_eq!(merged.len(), 3);
    }

    #[tokio::test]
    async fn test_recommend_rejects_zero_limit() {
        let catalog = MockCatalogQueries::new();
        let recommender = Recommender::new(Arc::new(catalog));

        let err = recommender
            .recommend(Uuid::new_v4(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_recommend_empty_favorites_yields_empty() {
        let mut catalog = MockCatalogQueries::new();
        catalog
            .expect_favorite_book_ids()
            .returning(|_| Ok(HashSet::new()));
        // No other expectations: the engine must not issue further queries

        let recommender = Recommender::new(Arc::new(catalog));
        let result = recommender
            .recommend(Uuid::new_v4(), DEFAULT_LIMIT)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_orders_author_series_shelf() {
        // Favorite A (author x, series s1, en, on a popular shelf); catalog
        // holds B (same author), C (same series), D (same shelf, new author)
        let fav = book("A", "x", "en", 4.0).with_series("s1");
        let b = book("B", "x", "en", 4.5);
        let c = book("C", "z", "en", 4.0).with_series("s1");
        let d = book("D", "y", "en", 4.8);
        let shelf_id = Uuid::new_v4();

        let mut catalog = MockCatalogQueries::new();
        let fav_id = fav.id;
        catalog
            .expect_favorite_book_ids()
            .returning(move |_| Ok(HashSet::from([fav_id])));
        let fav_clone = fav.clone();
        catalog
            .expect_books_by_id()
            .returning(move |_| Ok(vec![fav_clone.clone()]));
        catalog
            .expect_shelves_ranked_by_membership()
            .returning(move |_, _| Ok(vec![shelf_id]));
        let b_clone = b.clone();
        catalog
            .expect_books_by_author()
            .returning(move |_, _, _, _| Ok(vec![b_clone.clone()]));
        let c_clone = c.clone();
        catalog
            .expect_books_by_series()
            .returning(move |_, _, _, _| Ok(vec![c_clone.clone()]));
        let d_clone = d.clone();
        catalog
            .expect_books_on_shelves_with_popularity()
            .returning(move |_, _, _, _, _| Ok(vec![(d_clone.clone(), 1)]));

        let recommender = Recommender::new(Arc::new(catalog));
        let result = recommender.recommend(Uuid::new_v4(), 5).await.unwrap();

        let titles: Vec<&str> = result.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_recommend_dedupes_across_strategies() {
        // The same book qualifies by author and by series; it must appear
        // once, at the author-strategy position
        let fav = book("A", "x", "en", 4.0).with_series("s1");
        let dup = book("B", "x", "en", 4.5).with_series("s1");

        let mut catalog = MockCatalogQueries::new();
        let fav_id = fav.id;
        catalog
            .expect_favorite_book_ids()
            .returning(move |_| Ok(HashSet::from([fav_id])));
        let fav_clone = fav.clone();
        catalog
            .expect_books_by_id()
            .returning(move |_| Ok(vec![fav_clone.clone()]));
        catalog
            .expect_shelves_ranked_by_membership()
            .returning(|_, _| Ok(Vec::new()));
        let dup_by_author = dup.clone();
        catalog
            .expect_books_by_author()
            .returning(move |_, _, _, _| Ok(vec![dup_by_author.clone()]));
        let dup_by_series = dup.clone();
        catalog
            .expect_books_by_series()
            .returning(move |_, _, _, _| Ok(vec![dup_by_series.clone()]));
        catalog
            .expect_books_on_shelves_with_popularity()
            .returning(|_, _, _, _, _| Ok(Vec::new()));

        let recommender = Recommender::new(Arc::new(catalog));
        let result = recommender.recommend(Uuid::new_v4(), 5).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "B");
    }

    #[tokio::test]
    async fn test_recommend_limit_one_keeps_author_pick() {
        let fav = book("A", "x", "en", 4.0).with_series("s1");
        let b = book("B", "x", "en", 4.5);
        let c = book("C", "z", "en", 4.0).with_series("s1");

        let mut catalog = MockCatalogQueries::new();
        let fav_id = fav.id;
        catalog
            .expect_favorite_book_ids()
            .returning(move |_| Ok(HashSet::from([fav_id])));
        let fav_clone = fav.clone();
        catalog
            .expect_books_by_id()
            .returning(move |_| Ok(vec![fav_clone.clone()]));
        catalog
            .expect_shelves_ranked_by_membership()
            .returning(|_, _| Ok(Vec::new()));
        let b_clone = b.clone();
        catalog
            .expect_books_by_author()
            .returning(move |_, _, _, _| Ok(vec![b_clone.clone()]));
        let c_clone = c.clone();
        catalog
            .expect_books_by_series()
            .returning(move |_, _, _, _| Ok(vec![c_clone.clone()]));
        catalog
            .expect_books_on_shelves_with_popularity()
            .returning(|_, _, _, _, _| Ok(Vec::new()));

        let recommender = Recommender::new(Arc::new(catalog));
        let result = recommender.recommend(Uuid::new_v4(), 1).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "B");
    }

    #[tokio::test]
    async fn test_recommend_propagates_catalog_errors() {
        let mut catalog = MockCatalogQueries::new();
        catalog
            .expect_favorite_book_ids()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let recommender = Recommender::new(Arc::new(catalog));
        let err = recommender
            .recommend(Uuid::new_v4(), DEFAULT_LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
