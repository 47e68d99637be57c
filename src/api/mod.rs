//! API Module
//!
//! HTTP handlers and routing for the cache's HTTP surface.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value under a key
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `DELETE /clear` - Delete every key in both namespaces
//! - `GET /search` - Retrieve cached search results by query parameters
//! - `PUT /search` - Cache search results
//! - `GET /stats` - Get per-namespace statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
