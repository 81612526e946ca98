//! ScrollJar Server - HTTP API for the ScrollJar paste service
//!
//! # Features
//!
//! - **HTTP API**: Versioned REST API under `/v1` with an OpenAPI document
//! - **Admission control**: Global and per-client token buckets ahead of every handler
//! - **Authentication**: Opaque bearer tokens resolved into a request principal
//! - **Uploads**: Capability-gated streaming uploads to object storage
//!
//! # Architecture
//!
//! ```text
//! scrolljar-server/
//! └── presentation/       # HTTP layer
//!     ├── controllers/    # Request handlers and AppState
//!     ├── middleware/     # Request context, rate limiting, authentication
//!     ├── extractors.rs   # Principal, header and JSON extractors
//!     ├── models.rs       # DTOs with OpenAPI schemas
//!     └── routes.rs       # Route table and middleware stack
//! ```
//!
//! # API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/v1/ping` | GET | Liveness |
//! | `/v1/jar` | POST | Create a jar with scrolls |
//! | `/v1/jar/{id}` | GET, DELETE | Read or delete a jar |
//! | `/v1/jar/{id}/scrolls` | GET, POST | List or add scrolls |
//! | `/v1/scroll/{id}` | GET, POST, PATCH, DELETE | Read, upload, edit or delete a scroll |
//! | `/v1/user/register` | POST | Register |
//! | `/v1/user/activate` | PUT | Activate an account |
//! | `/v1/user/auth` | POST | Obtain bearer tokens |
//! | `/v1/token/activation` | POST | Mail a new activation token |

pub mod presentation;

pub use presentation::{ApiDoc, AppState, create_router};
