// Link previewer platform abstraction
// Resolves where the storage area lives on each OS and defines the rendering
// surface the content context draws the overlay on.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific directory layout at compile time.

use std::path::PathBuf;

pub mod headless;
pub mod surface;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

pub use headless::{HeadlessContent, HeadlessSurface};
pub use surface::Surface;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "LINK_PREVIEWER_DATA_DIR";

/// Returns the data directory holding `storage.db`.
///
/// `$LINK_PREVIEWER_DATA_DIR` wins when set and non-empty. Otherwise:
/// - **Linux**: `~/.local/share/link-previewer` (or `$XDG_DATA_HOME/link-previewer`)
/// - **macOS**: `~/Library/Application Support/LinkPreviewer`
/// - **Windows**: `%APPDATA%/LinkPreviewer`
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
