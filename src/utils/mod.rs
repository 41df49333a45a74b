//! Utility functions

pub mod connectivity;
pub mod cover_art;
pub mod genre;
mod m3u;
mod sanitize;
pub mod tui_log;

pub use m3u::{M3U_HEADER, m3u_entry, m3u_path};
pub use sanitize::{sanitize_filename, track_file_name};
pub use tui_log::{ConditionalStderrLayer, TuiSwitch};
