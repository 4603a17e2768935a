//! # Assetrack
//!
//! A self-hostable IT asset tracker: assets, employees, the checkout and
//! return lifecycle between them, per-user permissions, an audit trail and
//! spreadsheet import/export. Usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! assetrack = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use assetrack::auth::TokenIssuer;
//! use assetrack::server::{AppState, create_router};
//! use assetrack::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/assetrack.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     TokenIssuer::new("signing-secret", 24),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `assetrack` binary. Disable with `default-features = false`.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod transfer;
pub mod types;
