//! Authoritative in-memory catalog of books and reviews.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use bookshelf_kernel::Clock;
use serde_json::json;

use super::error::CatalogError;
use super::models::{Book, CreateBook, CreateReview, Review};
use super::seed;
use crate::utils::{average_rating, compare_titles};

const MIN_PUBLISHED_YEAR: i32 = 1000;

/// Books by id, reviews by id, and an index from book id to its review ids
/// in insertion order.
///
/// Every mutation that touches reviews recomputes the owning book's
/// `average_rating` and `total_reviews` before returning.
pub struct CatalogStore {
    books: HashMap<String, Book>,
    reviews: HashMap<String, Review>,
    reviews_by_book: HashMap<String, Vec<String>>,
    next_book_id: u64,
    next_review_id: u64,
    clock: Arc<dyn Clock>,
}

impl CatalogStore {
    /// An empty catalog.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            books: HashMap::new(),
            reviews: HashMap::new(),
            reviews_by_book: HashMap::new(),
            next_book_id: 1,
            next_review_id: 1,
            clock,
        }
    }

    /// A catalog holding the three sample books and their reviews.
    pub fn seeded(clock: Arc<dyn Clock>) -> Self {
        let mut store = Self::new(clock);
        store.restore(seed::books(), seed::reviews());
        store
    }

    /// Load existing records, rebuilding the review index and derived rating
    /// fields. Reviews pointing at unknown books are dropped.
    fn restore(&mut self, books: Vec<Book>, reviews: Vec<Review>) {
        for book in books {
            self.next_book_id = self.next_book_id.max(next_after(&book.id));
            self.reviews_by_book.entry(book.id.clone()).or_default();
            self.books.insert(book.id.clone(), book);
        }

        for review in reviews {
            let Some(index) = self.reviews_by_book.get_mut(&review.book_id) else {
                tracing::warn!(review_id = %review.id, book_id = %review.book_id, "skipping orphaned review");
                continue;
            };
            index.push(review.id.clone());
            self.next_review_id = self.next_review_id.max(next_after(&review.id));
            self.reviews.insert(review.id.clone(), review);
        }

        let ids: Vec<String> = self.books.keys().cloned().collect();
        for id in ids {
            if let Err(err) = self.refresh_rating(&id) {
                tracing::warn!(book_id = %id, error = %err, "failed to refresh seeded rating");
            }
        }
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    /// All books ordered by title.
    pub fn list_books(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.values().cloned().collect();
        books.sort_by(|a, b| compare_titles(&a.title, &b.title).then_with(|| a.id.cmp(&b.id)));
        books
    }

    pub fn get_book(&self, book_id: &str) -> Result<Book, CatalogError> {
        self.books
            .get(book_id)
            .cloned()
            .ok_or_else(CatalogError::book_not_found)
    }

    pub fn create_book(&mut self, request: CreateBook) -> Result<Book, CatalogError> {
        let title = request.title.trim();
        let author = request.author.trim();

        let mut missing = Vec::new();
        if title.is_empty() {
            missing.push(json!({ "field": "title", "error": "required" }));
        }
        if author.is_empty() {
            missing.push(json!({ "field": "author", "error": "required" }));
        }
        if !missing.is_empty() {
            return Err(CatalogError::missing_title_or_author(missing));
        }

        let isbn = non_empty(request.isbn);
        if let Some(isbn) = &isbn {
            if self
                .books
                .values()
                .any(|book| book.isbn.as_deref() == Some(isbn.as_str()))
            {
                return Err(CatalogError::duplicate_isbn(isbn));
            }
        }

        let now = self.clock.now();
        let max_year = now.year();
        if !(MIN_PUBLISHED_YEAR..=max_year).contains(&request.published_year) {
            return Err(CatalogError::invalid_published_year(
                request.published_year,
                max_year,
            ));
        }

        let id = allocate(&mut self.next_book_id, "book")?;
        let book = Book {
            id: id.clone(),
            title: title.to_string(),
            author: author.to_string(),
            isbn,
            published_year: request.published_year,
            genre: request.genre,
            description: request.description,
            cover_image: non_empty(request.cover_image),
            average_rating: 0.0,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        };

        self.reviews_by_book.insert(id.clone(), Vec::new());
        self.books.insert(id, book.clone());
        tracing::info!(book_id = %book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Reviews of `book_id`, most recent first.
    pub fn list_reviews_for_book(&self, book_id: &str) -> Result<Vec<Review>, CatalogError> {
        let index = self
            .reviews_by_book
            .get(book_id)
            .ok_or_else(CatalogError::book_not_found)?;

        // Walk newest-inserted first so equal timestamps keep that order under the stable sort.
        let mut reviews: Vec<Review> = index
            .iter()
            .rev()
            .filter_map(|id| self.reviews.get(id).cloned())
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    pub fn create_review(
        &mut self,
        book_id: &str,
        request: CreateReview,
    ) -> Result<Review, CatalogError> {
        if !self.books.contains_key(book_id) {
            return Err(CatalogError::book_not_found());
        }

        let reviewer_name = request.reviewer_name.trim();
        let mut problems = Vec::new();
        if reviewer_name.is_empty() {
            problems.push(json!({ "field": "reviewerName", "error": "required" }));
        }
        let rating = match u8::try_from(request.rating) {
            Ok(rating) if (1..=5).contains(&rating) => rating,
            _ => {
                problems.push(json!({ "field": "rating", "error": "must be between 1 and 5", "value": request.rating }));
                0
            }
        };
        if !problems.is_empty() {
            return Err(CatalogError::invalid_review(problems));
        }

        let now = self.clock.now();
        let id = allocate(&mut self.next_review_id, "review")?;
        let review = Review {
            id: id.clone(),
            book_id: book_id.to_string(),
            reviewer_name: reviewer_name.to_string(),
            rating,
            comment: request.comment,
            created_at: now,
            updated_at: now,
        };

        self.reviews.insert(id.clone(), review.clone());
        self.reviews_by_book
            .get_mut(book_id)
            .ok_or_else(|| anyhow!("review index missing for book {book_id}"))?
            .push(id);

        let book = self.refresh_rating(book_id)?;
        book.updated_at = now;
        tracing::info!(
            book_id,
            review_id = %review.id,
            average_rating = book.average_rating,
            total_reviews = book.total_reviews,
            "review created"
        );
        Ok(review)
    }

    /// Recompute the derived rating fields of `book_id` from its reviews.
    fn refresh_rating(&mut self, book_id: &str) -> Result<&mut Book, CatalogError> {
        let ratings: Vec<u8> = self
            .reviews_by_book
            .get(book_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.reviews.get(id).map(|r| r.rating))
                    .collect()
            })
            .unwrap_or_default();

        let book = self
            .books
            .get_mut(book_id)
            .ok_or_else(|| anyhow!("book {book_id} vanished during rating refresh"))?;
        book.average_rating = average_rating(&ratings);
        book.total_reviews = u32::try_from(ratings.len())
            .map_err(|_| anyhow!("review count overflow for book {book_id}"))?;
        Ok(book)
    }

    #[cfg(test)]
    pub(crate) fn now(&self) -> time::OffsetDateTime {
        self.clock.now()
    }
}

fn allocate(counter: &mut u64, kind: &str) -> Result<String, CatalogError> {
    let id = *counter;
    *counter = id
        .checked_add(1)
        .ok_or_else(|| anyhow!("{kind} id space exhausted"))?;
    Ok(id.to_string())
}

/// Numeric ids continue after the largest one seen; other ids don't move the counter.
fn next_after(id: &str) -> u64 {
    id.parse::<u64>().map(|n| n.saturating_add(1)).unwrap_or(1)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
