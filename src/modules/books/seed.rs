//! Sample catalog loaded into fresh stores when `catalog.seed` is on.
//!
//! Rating fields here are placeholders; the store recomputes them from the
//! seeded reviews when loading.

use time::macros::datetime;

use super::models::{Book, Review};

pub fn books() -> Vec<Book> {
    vec![
        Book {
            id: "1".to_string(),
            title: "The Great Gatsby".to_string(),
            author: "F. Scott Fitzgerald".to_string(),
            isbn: Some("978-0-7432-7356-5".to_string()),
            published_year: 1925,
            genre: "Classic Literature".to_string(),
            description: "A classic American novel set in the Jazz Age.".to_string(),
            cover_image: None,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: datetime!(2024-01-01 00:00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00:00 UTC),
        },
        Book {
            id: "2".to_string(),
            title: "To Kill a Mockingbird".to_string(),
            author: "Harper Lee".to_string(),
            isbn: Some("978-0-06-112008-4".to_string()),
            published_year: 1960,
            genre: "Classic Literature".to_string(),
            description: "A gripping tale of racial injustice and childhood innocence.".to_string(),
            cover_image: None,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: datetime!(2024-01-02 00:00:00 UTC),
            updated_at: datetime!(2024-01-02 00:00:00 UTC),
        },
        Book {
            id: "3".to_string(),
            title: "1984".to_string(),
            author: "George Orwell".to_string(),
            isbn: Some("978-0-452-28423-4".to_string()),
            published_year: 1949,
            genre: "Dystopian Fiction".to_string(),
            description: "A dystopian social science fiction novel and cautionary tale."
                .to_string(),
            cover_image: None,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: datetime!(2024-01-03 00:00:00 UTC),
            updated_at: datetime!(2024-01-03 00:00:00 UTC),
        },
    ]
}

pub fn reviews() -> Vec<Review> {
    vec![
        Review {
            id: "1".to_string(),
            book_id: "1".to_string(),
            reviewer_name: "Alice Johnson".to_string(),
            rating: 5,
            comment: "Absolutely brilliant! A masterpiece of American literature.".to_string(),
            created_at: datetime!(2024-01-15 10:00:00 UTC),
            updated_at: datetime!(2024-01-15 10:00:00 UTC),
        },
        Review {
            id: "2".to_string(),
            book_id: "1".to_string(),
            reviewer_name: "Bob Smith".to_string(),
            rating: 4,
            comment: "Great read, though the ending was a bit predictable.".to_string(),
            created_at: datetime!(2024-01-16 14:30:00 UTC),
            updated_at: datetime!(2024-01-16 14:30:00 UTC),
        },
        Review {
            id: "3".to_string(),
            book_id: "2".to_string(),
            reviewer_name: "Carol Davis".to_string(),
            rating: 5,
            comment: "A powerful story that everyone should read.".to_string(),
            created_at: datetime!(2024-01-17 09:15:00 UTC),
            updated_at: datetime!(2024-01-17 09:15:00 UTC),
        },
    ]
}
