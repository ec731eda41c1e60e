//! Link previewer: opens links in a movable, resizable overlay on top of the
//! current page instead of navigating away from it.
//!
//! The library holds the content-context controllers, the background
//! coordinator and the tokio actors that connect them. The binary in
//! `rpc_server.rs` serves the background over stdin/stdout.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod rpc_handler;
pub mod types;
