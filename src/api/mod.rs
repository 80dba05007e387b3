//! API Module
//!
//! HTTP handlers and routing for the portfolio REST API.
//!
//! # Endpoints
//! - `GET /returns` - Returns breakdown by asset class
//! - `GET /returns/monthly` - Monthly summary of the daily return history
//! - `GET /tasks/:name` - Latest stored result of a task
//! - `POST /tasks/:name` - Run a catalogued task now
//! - `GET /assets` / `POST /assets` - List or add portfolio assets
//! - `GET /assets/:id` - One portfolio asset
//! - `GET /stats` - Result cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
