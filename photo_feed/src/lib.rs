//! Photo Feed - Core Library
//!
//! Keeps an in-memory, deduplicated copy of a remote photo collection fresh
//! and serves paginated, sortable views of it over HTTP.

pub mod cli;
pub mod error;
pub mod middleware;
pub mod model;
pub mod query;
pub mod refresh;
pub mod server;
pub mod settings;
pub mod source;
pub mod store;
pub mod telemetry;

pub use error::FetchError;
pub use model::Photo;
pub use store::PhotoStore;
