// Link previewer state managers
// Managers own the stateful parts of the content context: history, focus, geometry, triggers and the preview session.

pub mod focus_manager;
pub mod geometry_manager;
pub mod history_manager;
pub mod preview_manager;
pub mod trigger_manager;
