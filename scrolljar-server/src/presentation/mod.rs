//! HTTP presentation layer

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod request_context;
pub mod routes;

pub use controllers::AppState;
pub use routes::{ApiDoc, create_router};
