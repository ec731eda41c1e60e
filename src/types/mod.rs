// Link previewer shared type definitions
// Each submodule defines plain data used across the managers and services.

pub mod errors;
pub mod geometry;
pub mod history;
pub mod input;
pub mod message;
pub mod session;
pub mod settings;
