use tracing::{debug, warn};

use crate::{
    readback::{with_texture_copy, BYTES_PER_PIXEL},
    Result,
};

pub const DEFAULT_PIXELS: u32 = 3;

/// The first `pixels` texels of row 0, never reaching into row padding.
pub async fn read_leading_pixels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    pixels: u32,
) -> Result<Vec<u8>> {
    let pixels = pixels.min(texture.width());
    if pixels == 0 {
        return Ok(Vec::new());
    }

    let len = (pixels * BYTES_PER_PIXEL) as usize;
    with_texture_copy(device, queue, texture, |data| data[..len].to_vec()).await
}

/// Read back and print the leading pixels of `texture`.
pub async fn print_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    pixels: u32,
) -> Result<Vec<u8>> {
    let bytes = read_leading_pixels(device, queue, texture, pixels).await?;
    println!("{bytes:?}");

    if is_blank(&bytes) {
        warn!("leading {} bytes read back as zero", bytes.len());
    } else {
        debug!("leading {} bytes read back", bytes.len());
    }

    Ok(bytes)
}

/// An upload that lost the race reads back as all zeros.
pub fn is_blank(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|b| *b == 0)
}
