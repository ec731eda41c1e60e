// Link previewer data directory on Linux
// Data: ~/.local/share/link-previewer

use std::env;
use std::path::PathBuf;

/// Uses `$XDG_DATA_HOME/link-previewer` if set, otherwise `~/.local/share/link-previewer`.
pub fn get_data_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("link-previewer")
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("link-previewer")
    }
}
