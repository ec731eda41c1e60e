// Link previewer data directory on macOS
// Data: ~/Library/Application Support/LinkPreviewer

use std::env;
use std::path::PathBuf;

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
        .join("Library")
        .join("Application Support")
        .join("LinkPreviewer")
}
