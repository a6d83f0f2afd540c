use tokio::sync::oneshot;
use tracing::debug;

use crate::{gpu::wait_for_submitted_work, Error, Result};

pub const BYTES_PER_PIXEL: u32 = 4;

/// Row stride alignment for buffer <-> texture copies (256)
pub const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// How a texture's texels sit in a readback buffer. Rows are padded out to
/// [`COPY_ALIGNMENT`] and are not repacked afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingLayout {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub unpadded_bytes_per_row: u32,
    pub padded_bytes_per_row: u32,
}

impl StagingLayout {
    pub fn for_size(width: u32, height: u32, layers: u32) -> Self {
        let unpadded_bytes_per_row = width * BYTES_PER_PIXEL;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(COPY_ALIGNMENT) * COPY_ALIGNMENT;

        Self {
            width,
            height,
            layers,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
        }
    }

    pub fn for_texture(texture: &wgpu::Texture) -> Result<Self> {
        let format = texture.format();
        if format.block_copy_size(None) != Some(BYTES_PER_PIXEL) {
            return Err(Error::UnsupportedFormat(format));
        }

        Ok(Self::for_size(
            texture.width(),
            texture.height(),
            texture.depth_or_array_layers(),
        ))
    }

    /// Total staging buffer size in bytes.
    pub fn size(&self) -> wgpu::BufferAddress {
        self.padded_bytes_per_row as wgpu::BufferAddress
            * self.height as wgpu::BufferAddress
            * self.layers as wgpu::BufferAddress
    }

    /// The texels of row `y` (counting across layers) without padding.
    pub fn row<'a>(&self, data: &'a [u8], y: u32) -> Option<&'a [u8]> {
        if y >= self.height * self.layers {
            return None;
        }

        let start = y as usize * self.padded_bytes_per_row as usize;
        data.get(start..start + self.unpadded_bytes_per_row as usize)
    }
}

#[cfg(test)]
thread_local! {
    static RELEASED: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// A host-readable buffer a texture gets copied into. Dropping it unmaps and
/// destroys the buffer, whichever way the read ends.
pub struct StagingBuffer {
    buffer: wgpu::Buffer,
    layout: StagingLayout,
    mapped: bool,
}

impl StagingBuffer {
    pub fn new(device: &wgpu::Device, layout: StagingLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("textureCopy"),
            size: layout.size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            layout,
            mapped: false,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Map the whole buffer for reading and wait until the mapping lands.
    pub async fn map_read(&mut self, device: &wgpu::Device) -> Result<()> {
        let (sender, receiver) = oneshot::channel();
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |res| {
                let _ = sender.send(res);
            });

        device.poll(wgpu::Maintain::Wait);
        receiver.await.map_err(|_| Error::SignalDropped)??;
        self.mapped = true;

        Ok(())
    }

    /// Hand the mapped bytes to `f`, then release the buffer.
    pub fn read<T>(self, f: impl FnOnce(&[u8]) -> T) -> T {
        let view = self.buffer.slice(..).get_mapped_range();
        let res = f(&view);
        drop(view);
        res
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if self.mapped {
            self.buffer.unmap();
            self.mapped = false;
        }
        self.buffer.destroy();

        #[cfg(test)]
        RELEASED.with(|n| n.set(n.get() + 1));
    }
}

/// Encode and submit a copy of every texel of `texture` into a fresh
/// staging buffer. Does not wait for the copy.
pub async fn copy_to_staging(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<StagingBuffer> {
    let layout = StagingLayout::for_texture(texture)?;
    debug!("staging layout {layout:?}, {} bytes", layout.size());

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let staging = StagingBuffer::new(device, layout);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("textureCopy"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging.buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(layout.padded_bytes_per_row),
                rows_per_image: Some(layout.height),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    if let Some(err) = device.pop_error_scope().await {
        return Err(Error::CopyRejected(err.to_string()));
    }

    Ok(staging)
}

/// Copy `texture` back to the host and run `f` over the padded bytes.
///
/// The staging buffer is unmapped and destroyed before this returns, also
/// when `f` fails or panics. Rows are [`StagingLayout::padded_bytes_per_row`]
/// apart; see [`StagingLayout::row`] for reading past the first.
pub async fn with_texture_copy<T>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    f: impl FnOnce(&[u8]) -> T,
) -> Result<T> {
    let mut staging = copy_to_staging(device, queue, texture).await?;
    wait_for_submitted_work(device, queue).await?;

    staging.map_read(device).await?;
    Ok(staging.read(f))
}
