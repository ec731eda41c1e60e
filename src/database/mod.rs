//! Link previewer storage layer.
//!
//! Provides the SQLite connection and schema migrations behind the
//! key/value storage area that the settings store persists into.
//!
//! # Usage
//!
//! ```no_run
//! use link_previewer::database::Database;
//!
//! // Open a persistent storage area
//! let db = Database::open("storage.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
