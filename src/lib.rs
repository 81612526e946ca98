//! ScrollJar - Shareable text snippets grouped into jars
//!
//! This crate wires the core services and the HTTP layer into a runnable
//! application. See [`create_app`].

pub mod app;

pub use app::{AppHandle, Backends, create_app, create_app_with};
pub use scrolljar_core::{Config, init_tracing};
