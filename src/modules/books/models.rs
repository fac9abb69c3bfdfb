use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A catalogued book with its derived rating summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Unique across books when present and non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub published_year: i32,
    pub genre: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Mean of this book's review ratings, one decimal place
    pub average_rating: f64,
    pub total_reviews: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Book {
    /// Case-insensitive match on title, author or genre.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.title, &self.author, &self.genre]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A single star rating and comment left on a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub book_id: String,
    pub reviewer_name: String,
    pub rating: u8,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    pub published_year: i32,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Request model for reviewing a book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[serde(default)]
    pub reviewer_name: String,
    /// Kept wide so out-of-range ratings reach validation instead of failing to parse.
    /// Absent reads as 0, which validation rejects.
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

/// Body of `POST /cache/outage`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateOutage {
    pub duration_ms: Option<u64>,
}

/// Query string of `GET /`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    pub q: Option<String>,
}
