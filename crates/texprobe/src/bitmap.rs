use crate::{Error, Result};

/// A decoded image, tightly packed RGBA8 with straight alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Bitmap {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage);
        }

        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    /// Every pixel set to `rgba`.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage);
        }

        let pixels = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        })
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}
