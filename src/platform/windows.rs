// Link previewer data directory on Windows
// Data: %APPDATA%/LinkPreviewer

use std::env;
use std::path::PathBuf;

pub fn get_data_dir() -> PathBuf {
    let appdata = env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Temp"));
    PathBuf::from(appdata).join("LinkPreviewer")
}
