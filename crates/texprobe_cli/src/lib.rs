mod args;

pub use args::{parse_format, Args, DEFAULT_PREVIEW_DIR, DEFAULT_SOURCE};
