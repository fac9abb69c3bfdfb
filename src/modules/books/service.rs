//! Operation boundary in front of the catalog store.
//!
//! Each call waits out the simulated latency, then touches the store inside a
//! single short critical section. The list path reads through the cache and
//! fills it under the store lock; the write paths invalidate it under the same
//! lock. Cache trouble never reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use bookshelf_cache::{CacheLayer, CacheState};
use bookshelf_http::ApiResponse;
use bookshelf_kernel::settings::{CacheSettings, Settings};
use bookshelf_kernel::{Clock, Latency, RandomLatency, SystemClock};
use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;

use super::error::CatalogError;
use super::models::{Book, CreateBook, CreateReview, Review};
use super::store::CatalogStore;

pub const BOOKS_CACHE_KEY: &str = "books";

/// Reported by `GET /cache` and `POST /cache/outage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub enabled: bool,
    pub online: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub outage_until: Option<OffsetDateTime>,
}

pub struct CatalogService {
    store: Mutex<CatalogStore>,
    cache: Option<CacheLayer<Vec<Book>>>,
    latency: Arc<dyn Latency>,
    cache_ttl: Duration,
    default_outage: Duration,
}

impl CatalogService {
    pub fn new(
        store: CatalogStore,
        cache: Option<CacheLayer<Vec<Book>>>,
        latency: Arc<dyn Latency>,
        cache_settings: &CacheSettings,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            cache,
            latency,
            cache_ttl: Duration::from_secs(cache_settings.ttl_seconds),
            default_outage: Duration::from_millis(cache_settings.outage_ms),
        }
    }

    /// Wire the service from settings using the system clock and random latency.
    pub fn from_settings(settings: &Settings) -> Self {
        let latency = RandomLatency::from_millis(
            settings.catalog.latency_min_ms,
            settings.catalog.latency_max_ms,
        );
        Self::with_time(settings, Arc::new(SystemClock), Arc::new(latency))
    }

    /// Wire the service from settings with explicit time sources.
    pub fn with_time(
        settings: &Settings,
        clock: Arc<dyn Clock>,
        latency: Arc<dyn Latency>,
    ) -> Self {
        let store = if settings.catalog.seed {
            CatalogStore::seeded(clock.clone())
        } else {
            CatalogStore::new(clock.clone())
        };
        let cache = settings
            .cache
            .enabled
            .then(|| CacheLayer::new(clock));

        Self::new(store, cache, latency, &settings.cache)
    }

    pub fn book_count(&self) -> usize {
        self.store.lock().book_count()
    }

    /// All books ordered by title, optionally narrowed by a search term.
    ///
    /// The cache always holds the unfiltered list; filtering happens per call.
    pub async fn list_books(
        &self,
        search: Option<&str>,
    ) -> Result<ApiResponse<Vec<Book>>, CatalogError> {
        self.latency.pause().await;

        let narrow = |books: Vec<Book>| match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => books.into_iter().filter(|b| b.matches(term)).collect(),
            None => books,
        };

        if let Some(cache) = &self.cache {
            if let Some(books) = cache.get(BOOKS_CACHE_KEY) {
                tracing::debug!(count = books.len(), "cache hit: books served from cache");
                return Ok(ApiResponse::ok(narrow(books), "Books retrieved from cache"));
            }
            tracing::debug!("cache miss: reading books from store");
            if !cache.is_online() {
                tracing::warn!("cache service is down, falling back to store");
            }
        }

        // The store guard spans the cache fill so no write can invalidate in between.
        let books = {
            let store = self.store.lock();
            let books = store.list_books();
            if let Some(cache) = &self.cache {
                if !cache.set(BOOKS_CACHE_KEY, books.clone(), self.cache_ttl) {
                    tracing::debug!("cache refused books list");
                }
            }
            books
        };

        Ok(ApiResponse::ok(narrow(books), "Books retrieved successfully"))
    }

    pub async fn get_book(&self, book_id: &str) -> Result<ApiResponse<Book>, CatalogError> {
        self.latency.pause().await;

        let book = self
            .store
            .lock()
            .get_book(book_id)
            .map_err(|e| e.at_boundary("Failed to retrieve book"))?;
        Ok(ApiResponse::ok(book, "Book retrieved successfully"))
    }

    pub async fn create_book(&self, request: CreateBook) -> Result<ApiResponse<Book>, CatalogError> {
        self.latency.pause().await;

        let book = {
            let mut store = self.store.lock();
            let book = store
                .create_book(request)
                .map_err(|e| e.at_boundary("Failed to create book"))?;
            self.invalidate_books();
            book
        };
        Ok(ApiResponse::created(book, "Book created successfully"))
    }

    pub async fn list_reviews(
        &self,
        book_id: &str,
    ) -> Result<ApiResponse<Vec<Review>>, CatalogError> {
        self.latency.pause().await;

        let reviews = self
            .store
            .lock()
            .list_reviews_for_book(book_id)
            .map_err(|e| e.at_boundary("Failed to retrieve reviews"))?;
        Ok(ApiResponse::ok(reviews, "Reviews retrieved successfully"))
    }

    pub async fn create_review(
        &self,
        book_id: &str,
        request: CreateReview,
    ) -> Result<ApiResponse<Review>, CatalogError> {
        self.latency.pause().await;

        let review = {
            let mut store = self.store.lock();
            let review = store
                .create_review(book_id, request)
                .map_err(|e| e.at_boundary("Failed to create review"))?;
            // The cached list carries the book's old rating.
            self.invalidate_books();
            review
        };
        Ok(ApiResponse::created(review, "Review created successfully"))
    }

    pub fn cache_status(&self) -> CacheStatus {
        match &self.cache {
            None => CacheStatus {
                enabled: false,
                online: false,
                outage_until: None,
            },
            Some(cache) => match cache.state() {
                CacheState::Online => CacheStatus {
                    enabled: true,
                    online: true,
                    outage_until: None,
                },
                CacheState::Outage { until } => CacheStatus {
                    enabled: true,
                    online: false,
                    outage_until: Some(until),
                },
            },
        }
    }

    /// Force the cache offline for `duration`, or the configured default.
    pub fn simulate_cache_outage(&self, duration: Option<Duration>) -> ApiResponse<CacheStatus> {
        match &self.cache {
            Some(cache) => {
                cache.simulate_outage(duration.unwrap_or(self.default_outage));
                ApiResponse::accepted(self.cache_status(), "Cache outage simulated")
            }
            None => ApiResponse::ok(self.cache_status(), "Cache is disabled"),
        }
    }

    fn invalidate_books(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(BOOKS_CACHE_KEY);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::{ManualClock, NoLatency};
    use time::macros::datetime;

    fn service_with(settings: Settings) -> (Arc<ManualClock>, CatalogService) {
        let clock = Arc::new(ManualClock::new(datetime!(2025-06-01 09:00:00 UTC)));
        let service = CatalogService::with_time(&settings, clock.clone(), Arc::new(NoLatency));
        (clock, service)
    }

    fn service() -> (Arc<ManualClock>, CatalogService) {
        service_with(Settings::default())
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    fn new_book(title: &str) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            author: "Mary Shelley".to_string(),
            published_year: 1818,
            ..CreateBook::default()
        }
    }

    #[tokio::test]
    async fn second_list_is_served_from_cache() {
        let (_clock, service) = service();

        let first = service.list_books(None).await.unwrap();
        assert_eq!(first.message, "Books retrieved successfully");
        assert_eq!(first.status, 200);

        let second = service.list_books(None).await.unwrap();
        assert_eq!(second.message, "Books retrieved from cache");
        assert_eq!(second.data, first.data);
    }

    #[tokio::test]
    async fn cached_list_expires_after_ttl() {
        let (clock, service) = service();
        service.list_books(None).await.unwrap();

        clock.advance(Duration::from_secs(300));
        let response = service.list_books(None).await.unwrap();
        assert_eq!(response.message, "Books retrieved successfully");
    }

    #[tokio::test]
    async fn create_book_invalidates_cached_list() {
        let (_clock, service) = service();
        service.list_books(None).await.unwrap();

        let created = service.create_book(new_book("Frankenstein")).await.unwrap();
        assert_eq!(created.status, 201);
        assert_eq!(created.message, "Book created successfully");

        let response = service.list_books(None).await.unwrap();
        assert_eq!(response.message, "Books retrieved successfully");
        assert_eq!(
            titles(&response.data),
            vec!["1984", "Frankenstein", "The Great Gatsby", "To Kill a Mockingbird"]
        );
    }

    #[tokio::test]
    async fn create_review_refreshes_cached_rating() {
        let (_clock, service) = service();
        service.list_books(None).await.unwrap();

        let review = service
            .create_review(
                "3",
                CreateReview {
                    reviewer_name: "Winston".to_string(),
                    rating: 2,
                    comment: String::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(review.status, 201);

        let books = service.list_books(None).await.unwrap().data;
        let orwell = books.iter().find(|b| b.id == "3").unwrap();
        assert_eq!(orwell.total_reviews, 1);
        assert_eq!(orwell.average_rating, 2.0);
    }

    #[tokio::test]
    async fn outage_falls_back_to_store_and_recovers() {
        let (clock, service) = service();
        service.list_books(None).await.unwrap();

        let outage = service.simulate_cache_outage(Some(Duration::from_secs(5)));
        assert_eq!(outage.status, 202);
        assert!(!outage.data.online);

        // Reads still succeed, straight from the store, and are not cached.
        for _ in 0..2 {
            let response = service.list_books(None).await.unwrap();
            assert_eq!(response.message, "Books retrieved successfully");
            assert_eq!(response.data.len(), 3);
        }

        clock.advance(Duration::from_secs(5));
        assert!(service.cache_status().online);
        assert_eq!(
            service.list_books(None).await.unwrap().message,
            "Books retrieved from cache"
        );
    }

    #[tokio::test]
    async fn write_during_outage_is_not_hidden_by_stale_cache() {
        let (clock, service) = service();
        service.list_books(None).await.unwrap();
        service.simulate_cache_outage(None);

        service.create_book(new_book("Frankenstein")).await.unwrap();

        clock.advance(Duration::from_millis(5000));
        let books = service.list_books(None).await.unwrap();
        assert_eq!(books.message, "Books retrieved successfully");
        assert_eq!(books.data.len(), 4);
    }

    #[tokio::test]
    async fn disabled_cache_always_reads_store() {
        let mut settings = Settings::default();
        settings.cache.enabled = false;
        let (_clock, service) = service_with(settings);

        for _ in 0..2 {
            let response = service.list_books(None).await.unwrap();
            assert_eq!(response.message, "Books retrieved successfully");
        }
        assert!(!service.cache_status().enabled);
        assert_eq!(service.simulate_cache_outage(None).status, 200);
    }

    #[tokio::test]
    async fn search_filters_without_touching_cache_contents() {
        let (_clock, service) = service();

        let found = service.list_books(Some("classic")).await.unwrap();
        assert_eq!(
            titles(&found.data),
            vec!["The Great Gatsby", "To Kill a Mockingbird"]
        );

        let found = service.list_books(Some("ORWELL")).await.unwrap();
        assert_eq!(found.message, "Books retrieved from cache");
        assert_eq!(titles(&found.data), vec!["1984"]);

        let all = service.list_books(Some("  ")).await.unwrap();
        assert_eq!(all.data.len(), 3);
    }

    #[tokio::test]
    async fn errors_keep_their_classification() {
        let (_clock, service) = service();

        let err = service.list_reviews("42").await.unwrap_err();
        assert_eq!(err.status(), 404);

        let err = service
            .create_book(CreateBook {
                isbn: Some("978-0-452-28423-4".to_string()),
                ..new_book("Animal Farm")
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), 409);

        let err = service.create_book(new_book("")).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn unseeded_catalog_starts_empty() {
        let mut settings = Settings::default();
        settings.catalog.seed = false;
        let (_clock, service) = service_with(settings);

        assert_eq!(service.book_count(), 0);
        let created = service.create_book(new_book("Frankenstein")).await.unwrap();
        assert_eq!(created.data.id, "1");
    }

    /// Blocks the thread inside the `nth` call to `now`, flagging entry.
    struct StallingClock {
        calls: std::sync::atomic::AtomicUsize,
        stall_on: usize,
        stalled: std::sync::atomic::AtomicBool,
    }

    impl Clock for StallingClock {
        fn now(&self) -> OffsetDateTime {
            use std::sync::atomic::Ordering;
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.stall_on {
                self.stalled.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(300));
            }
            OffsetDateTime::now_utc()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn write_during_cache_fill_is_not_hidden() {
        use std::sync::atomic::Ordering;

        // Lister touches the cache clock in get, state, then set.
        let clock = Arc::new(StallingClock {
            calls: Default::default(),
            stall_on: 3,
            stalled: Default::default(),
        });
        let service = Arc::new(CatalogService::new(
            CatalogStore::seeded(Arc::new(SystemClock)),
            Some(CacheLayer::new(clock.clone())),
            Arc::new(NoLatency),
            &CacheSettings::default(),
        ));

        let lister = tokio::spawn({
            let service = service.clone();
            async move { service.list_books(None).await.map(|r| r.data.len()) }
        });
        while !clock.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let writer = tokio::spawn({
            let service = service.clone();
            async move { service.create_book(new_book("Frankenstein")).await.map(|r| r.status) }
        });

        assert_eq!(lister.await.unwrap().unwrap(), 3);
        assert_eq!(writer.await.unwrap().unwrap(), 201);

        let after = service.list_books(None).await.unwrap();
        assert_eq!(after.message, "Books retrieved successfully");
        assert_eq!(after.data.len(), 4);
    }
}
