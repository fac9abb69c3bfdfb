pub mod error;
pub mod models;
pub mod routes;
pub mod seed;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::{json, Value};

use service::CatalogService;

/// Book catalog, reviews, and the cached book list
pub struct BooksModule {
    service: Arc<CatalogService>,
}

impl BooksModule {
    pub fn new(service: Arc<CatalogService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<CatalogService> {
        &self.service
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = self.service.book_count(),
            cache_enabled = ctx.settings.cache.enabled,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn envelope(description: &str, data: Value) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": {
                        "data": data,
                        "message": { "type": "string" },
                        "status": { "type": "integer" }
                    },
                    "required": ["data", "message", "status"]
                }
            }
        }
    })
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn book_id_param() -> Value {
    json!([{ "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }])
}

fn openapi_fragment() -> Value {
    json!({
        "paths": paths(),
        "components": { "schemas": schemas() }
    })
}

fn paths() -> Value {
    let book = json!({ "$ref": "#/components/schemas/Book" });
    let books = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } });
    let review = json!({ "$ref": "#/components/schemas/Review" });
    let reviews = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Review" } });

    json!({
        "/": {
            "get": {
                "summary": "List books ordered by title",
                "tags": ["Books"],
                "parameters": [{
                    "name": "q", "in": "query", "required": false,
                    "description": "Case-insensitive match on title, author or genre",
                    "schema": { "type": "string" }
                }],
                "responses": {
                    "200": envelope("List of books", books),
                    "500": error_response("Internal server error")
                }
            },
            "post": {
                "summary": "Create a book",
                "tags": ["Books"],
                "requestBody": json_body("CreateBook"),
                "responses": {
                    "201": envelope("Book created", book.clone()),
                    "400": error_response("Missing title or author, or implausible year"),
                    "409": error_response("Duplicate ISBN"),
                    "500": error_response("Internal server error")
                }
            }
        },
        "/{id}": {
            "get": {
                "summary": "Get a book",
                "tags": ["Books"],
                "parameters": book_id_param(),
                "responses": {
                    "200": envelope("The book", book),
                    "404": error_response("Unknown book")
                }
            }
        },
        "/{id}/reviews": {
            "get": {
                "summary": "List reviews for a book, newest first",
                "tags": ["Reviews"],
                "parameters": book_id_param(),
                "responses": {
                    "200": envelope("List of reviews", reviews),
                    "404": error_response("Unknown book"),
                    "500": error_response("Internal server error")
                }
            },
            "post": {
                "summary": "Review a book",
                "tags": ["Reviews"],
                "parameters": book_id_param(),
                "requestBody": json_body("CreateReview"),
                "responses": {
                    "201": envelope("Review created", review),
                    "400": error_response("Invalid rating or reviewer name"),
                    "404": error_response("Unknown book"),
                    "500": error_response("Internal server error")
                }
            }
        },
        "/cache": {
            "get": {
                "summary": "Cache status",
                "tags": ["Cache"],
                "responses": { "200": envelope("Cache status", json!({ "$ref": "#/components/schemas/CacheStatus" })) }
            }
        },
        "/cache/outage": {
            "post": {
                "summary": "Simulate a cache outage",
                "tags": ["Cache"],
                "requestBody": {
                    "required": false,
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "object",
                                "properties": { "durationMs": { "type": "integer", "minimum": 0 } }
                            }
                        }
                    }
                },
                "responses": { "202": envelope("Outage started", json!({ "$ref": "#/components/schemas/CacheStatus" })) }
            }
        },
        "/health": {
            "get": {
                "summary": "Books health check",
                "tags": ["Books"],
                "responses": {
                    "200": {
                        "description": "OK",
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        }
    })
}

fn schemas() -> Value {
    json!({
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "title": { "type": "string" },
                "author": { "type": "string" },
                "isbn": { "type": "string" },
                "publishedYear": { "type": "integer" },
                "genre": { "type": "string" },
                "description": { "type": "string" },
                "coverImage": { "type": "string" },
                "averageRating": { "type": "number", "minimum": 0, "maximum": 5 },
                "totalReviews": { "type": "integer", "minimum": 0 },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": [
                "id", "title", "author", "publishedYear", "genre", "description",
                "averageRating", "totalReviews", "createdAt", "updatedAt"
            ]
        },
        "CreateBook": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "isbn": { "type": "string" },
                "publishedYear": { "type": "integer", "minimum": 1000 },
                "genre": { "type": "string" },
                "description": { "type": "string" },
                "coverImage": { "type": "string" }
            },
            "required": ["title", "author", "publishedYear"]
        },
        "Review": {
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "bookId": { "type": "string" },
                "reviewerName": { "type": "string" },
                "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                "comment": { "type": "string" },
                "createdAt": { "type": "string", "format": "date-time" },
                "updatedAt": { "type": "string", "format": "date-time" }
            },
            "required": ["id", "bookId", "reviewerName", "rating", "comment", "createdAt", "updatedAt"]
        },
        "CreateReview": {
            "type": "object",
            "properties": {
                "reviewerName": { "type": "string" },
                "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                "comment": { "type": "string" }
            },
            "required": ["reviewerName", "rating"]
        },
        "CacheStatus": {
            "type": "object",
            "properties": {
                "enabled": { "type": "boolean" },
                "online": { "type": "boolean" },
                "outageUntil": { "type": "string", "format": "date-time", "nullable": true }
            },
            "required": ["enabled", "online"]
        }
    })
}

/// Create the books module from application settings
pub fn create_module(settings: &bookshelf_kernel::settings::Settings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(CatalogService::from_settings(
        settings,
    ))))
}
