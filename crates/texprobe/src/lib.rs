mod bitmap;
mod error;
pub mod gpu;
pub mod preview;
pub mod print;
pub mod probe;
pub mod readback;
pub mod source;
pub mod upload;

pub use bitmap::Bitmap;
pub use error::{Error, Result};
pub use gpu::{wait_for_submitted_work, Gpu};
pub use preview::{show_bitmap, PreviewSurface};
pub use print::{print_texture, read_leading_pixels, DEFAULT_PIXELS};
pub use probe::{run_probe, ProbeOutcome, ProbeReport};
pub use readback::{with_texture_copy, StagingBuffer, StagingLayout};
pub use source::{load_bitmap, ImageSource};
pub use upload::{bitmap_to_texture, preferred_format, texture_from_source, TextureOptions};
