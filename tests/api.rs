use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookshelf_kernel::settings::Settings;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let mut settings = Settings::default();
    settings.catalog.latency_min_ms = 0;
    settings.catalog.latency_max_ms = 0;

    let registry = bookshelf_app::build_registry(&settings).unwrap();
    bookshelf_http::build_router(&registry, &settings)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn lists_seed_books_in_title_order() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/books", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["message"], "Books retrieved successfully");
    assert_eq!(
        titles(&body),
        vec!["1984", "The Great Gatsby", "To Kill a Mockingbird"]
    );

    let (_, cached) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(cached["message"], "Books retrieved from cache");
}

#[tokio::test]
async fn search_narrows_the_list() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/books?q=harper", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["To Kill a Mockingbird"]);
}

#[tokio::test]
async fn lists_seed_reviews_newest_first() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/books/1/reviews", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["reviewerName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob Smith", "Alice Johnson"]);
    assert_eq!(body["data"][0]["createdAt"], "2024-01-16T14:30:00Z");
}

#[tokio::test]
async fn unknown_book_is_404_with_error_envelope() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/books/404/reviews", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["status"], 404);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "Book not found");
    assert!(body["error"]["trace_id"].is_string());
}

#[tokio::test]
async fn creates_book_and_rejects_duplicate_isbn() {
    let app = app();
    let request = json!({
        "title": "Brave New World",
        "author": "Aldous Huxley",
        "isbn": "978-0-06-085052-4",
        "publishedYear": 1932,
        "genre": "Dystopian Fiction",
        "description": "A futuristic World State."
    });

    let (status, body) = send(&app, Method::POST, "/api/books", Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], 201);
    assert_eq!(body["data"]["id"], "4");
    assert_eq!(body["data"]["averageRating"], 0.0);
    assert_eq!(body["data"]["totalReviews"], 0);

    let (status, body) = send(&app, Method::POST, "/api/books", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Book with this ISBN already exists");

    let (_, list) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(
        titles(&list),
        vec![
            "1984",
            "Brave New World",
            "The Great Gatsby",
            "To Kill a Mockingbird"
        ]
    );
}

#[tokio::test]
async fn missing_title_is_400() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": "", "author": "Anon", "publishedYear": 2000 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Title and author are required");
    assert_eq!(body["error"]["details"][0]["field"], "title");
}

#[tokio::test]
async fn absent_title_is_400_with_error_envelope() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "author": "Anon", "publishedYear": 2000 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], 400);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["message"], "Title and author are required");
    assert_eq!(body["error"]["details"][0]["field"], "title");
}

#[tokio::test]
async fn absent_reviewer_name_is_400_with_error_envelope() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/1/reviews",
        Some(json!({ "rating": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], 400);
    assert_eq!(
        body["error"]["message"],
        "Invalid review data. Rating must be between 1-5 and reviewer name is required"
    );

    let (_, reviews) = send(&app, Method::GET, "/api/books/1/reviews", None).await;
    assert_eq!(reviews["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_body_is_400_with_error_envelope() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/1/reviews",
        Some(json!({ "reviewerName": "Dana", "rating": "five" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["message"], "Invalid request body");
}

#[tokio::test]
async fn review_updates_book_rating() {
    let app = app();

    for rating in [0, 6] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/books/1/reviews",
            Some(json!({ "reviewerName": "Dana", "rating": rating, "comment": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/1/reviews",
        Some(json!({ "reviewerName": "Dana", "rating": 5, "comment": "Loved it" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["bookId"], "1");
    assert_eq!(body["message"], "Review created successfully");

    let (_, book) = send(&app, Method::GET, "/api/books/1", None).await;
    // (5 + 4 + 5) / 3 = 4.666.. -> 4.7
    assert_eq!(book["data"]["averageRating"], 4.7);
    assert_eq!(book["data"]["totalReviews"], 3);
}

#[tokio::test]
async fn review_for_unknown_book_is_404() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/books/99/reviews",
        Some(json!({ "reviewerName": "Dana", "rating": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cache_outage_endpoint_takes_cache_offline() {
    let app = app();
    send(&app, Method::GET, "/api/books", None).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/cache/outage",
        Some(json!({ "durationMs": 60000 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["online"], false);

    let (_, list) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(list["message"], "Books retrieved successfully");

    let (_, status_body) = send(&app, Method::GET, "/api/books/cache", None).await;
    assert_eq!(status_body["data"]["enabled"], true);
    assert_eq!(status_body["data"]["online"], false);
    assert!(status_body["data"]["outageUntil"].is_string());
}

#[tokio::test]
async fn cache_outage_without_body_uses_default() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/api/books/cache/outage", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["online"], false);
}

#[tokio::test]
async fn openapi_document_lists_book_routes() {
    let app = app();
    let (status, spec) = send(&app, Method::GET, "/docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/api/books"]["post"].is_object());
    assert!(spec["paths"]["/api/books/{id}/reviews"]["get"].is_object());
    assert!(spec["components"]["schemas"]["Review"].is_object());
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
