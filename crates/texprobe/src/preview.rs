use std::path::PathBuf;

use image::{ImageFormat, RgbaImage};

use crate::{Bitmap, Error, Result};

/// Where the decoded bitmap gets drawn for a visual cross-check against
/// what the gpu reads back. The directory has to exist up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSurface {
    pub dir: PathBuf,
    pub name: String,
}

impl PreviewSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            name: "show-test".to_string(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.png", self.name))
    }
}

/// Draw `bitmap` onto the preview surface, replacing what was there.
pub fn show_bitmap(surface: &PreviewSurface, bitmap: &Bitmap) -> Result<PathBuf> {
    if !surface.dir.is_dir() {
        return Err(Error::MissingPreviewSurface(surface.dir.clone()));
    }

    let img = RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.rgba.clone())
        .ok_or_else(|| {
            Error::Generic(format!(
                "bitmap buffer does not match {}x{}",
                bitmap.width, bitmap.height
            ))
        })?;

    let path = surface.path();
    img.save_with_format(&path, ImageFormat::Png)?;

    Ok(path)
}
