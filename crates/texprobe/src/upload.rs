use tracing::debug;

use crate::{
    gpu::{wait_for_submitted_work, Gpu},
    preview::{show_bitmap, PreviewSurface},
    source::{load_bitmap, ImageSource},
    Bitmap, Error, Result,
};

/// Usable for binding, copying in either direction and rendering.
pub const DEFAULT_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::RENDER_ATTACHMENT);

#[derive(Debug, Clone, Default)]
pub struct TextureOptions {
    pub format: Option<wgpu::TextureFormat>,
    pub usage: Option<wgpu::TextureUsages>,
    pub label: Option<String>,
}

/// The format a browser would pick for a presentation surface on this
/// platform.
pub fn preferred_format() -> wgpu::TextureFormat {
    if cfg!(target_os = "android") {
        wgpu::TextureFormat::Rgba8Unorm
    } else {
        wgpu::TextureFormat::Bgra8Unorm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelOrder {
    Rgba,
    Bgra,
}

fn channel_order(format: wgpu::TextureFormat) -> Result<ChannelOrder> {
    use wgpu::TextureFormat as F;

    match format {
        F::Rgba8Unorm | F::Rgba8UnormSrgb => Ok(ChannelOrder::Rgba),
        F::Bgra8Unorm | F::Bgra8UnormSrgb => Ok(ChannelOrder::Bgra),
        other => Err(Error::UnsupportedFormat(other)),
    }
}

/// Lay the bitmap's RGBA bytes out in the texture's channel order.
fn texel_bytes(bitmap: &Bitmap, order: ChannelOrder) -> Vec<u8> {
    match order {
        ChannelOrder::Rgba => bitmap.rgba.clone(),
        ChannelOrder::Bgra => bitmap
            .rgba
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0], px[3]])
            .collect(),
    }
}

/// Allocate a texture the size of `bitmap` and enqueue a copy of the whole
/// image into it.
///
/// This does not wait for the copy to finish. Callers that read the texture
/// afterwards need [`wait_for_submitted_work`] first.
pub async fn bitmap_to_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bitmap: &Bitmap,
    options: &TextureOptions,
) -> Result<wgpu::Texture> {
    let format = options.format.unwrap_or_else(preferred_format);
    let usage = options.usage.unwrap_or(DEFAULT_USAGE);
    let order = channel_order(format)?;
    let extent = bitmap.extent();

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: options.label.as_deref(),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });

    let texels = texel_bytes(bitmap, order);
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bitmap.bytes_per_row()),
            rows_per_image: Some(bitmap.height),
        },
        extent,
    );

    // creation and copy errors both land here, the first one wins
    if let Some(err) = device.pop_error_scope().await {
        return Err(Error::TextureRejected(err.to_string()));
    }

    debug!(
        "enqueued copy into {}x{} {:?} texture {:?}",
        extent.width, extent.height, format, options.label
    );

    Ok(texture)
}

/// Textures without an explicit label are named after where they came from.
fn labelled(options: &TextureOptions, source: &ImageSource) -> TextureOptions {
    TextureOptions {
        label: options.label.clone().or_else(|| Some(source.to_string())),
        ..options.clone()
    }
}

/// Fetch, decode and upload `source`, then wait for the queue to drain.
///
/// The copy is only guaranteed visible to later reads once the wait
/// resolves, and on some drivers not even then. That ordering is what the
/// probe exists to observe, so nothing else is done to enforce it.
pub async fn texture_from_source(
    gpu: &Gpu,
    source: &ImageSource,
    options: &TextureOptions,
    preview: Option<&PreviewSurface>,
) -> Result<wgpu::Texture> {
    let bitmap = load_bitmap(source).await?;

    let options = labelled(options, source);
    let texture = bitmap_to_texture(&gpu.device, &gpu.queue, &bitmap, &options).await?;
    wait_for_submitted_work(&gpu.device, &gpu.queue).await?;

    if let Some(surface) = preview {
        let path = show_bitmap(surface, &bitmap)?;
        debug!("preview written to {}", path.display());
    }

    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing;

    #[test]
    fn default_usage_has_everything() {
        for flag in [
            wgpu::TextureUsages::TEXTURE_BINDING,
            wgpu::TextureUsages::COPY_SRC,
            wgpu::TextureUsages::COPY_DST,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        ] {
            assert!(DEFAULT_USAGE.contains(flag));
        }
        assert!(!DEFAULT_USAGE.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }

    #[test]
    fn preferred_format_is_uploadable() {
        assert!(channel_order(preferred_format()).is_ok());
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        let bitmap = Bitmap {
            width: 2,
            height: 1,
            rgba: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        assert_eq!(
            texel_bytes(&bitmap, ChannelOrder::Bgra),
            vec![3, 2, 1, 4, 7, 6, 5, 8]
        );
        assert_eq!(texel_bytes(&bitmap, ChannelOrder::Rgba), bitmap.rgba);
    }

    #[test]
    fn float_formats_are_unsupported() {
        assert!(matches!(
            channel_order(wgpu::TextureFormat::Rgba16Float),
            Err(Error::UnsupportedFormat(wgpu::TextureFormat::Rgba16Float))
        ));
    }

    #[test]
    fn label_defaults_to_source() {
        let source = ImageSource::parse("https://example.com/bird.jpg").unwrap();
        let options = TextureOptions {
            format: Some(wgpu::TextureFormat::Rgba8Unorm),
            ..Default::default()
        };

        let resolved = labelled(&options, &source);
        assert_eq!(
            resolved.label.as_deref(),
            Some("https://example.com/bird.jpg")
        );
        assert_eq!(resolved.format, options.format);
        assert_eq!(resolved.usage, None);
    }

    #[test]
    fn explicit_label_wins() {
        let source = ImageSource::parse("solid:2x2:0,0,0,255").unwrap();
        let options = TextureOptions {
            label: Some("bird".to_string()),
            ..Default::default()
        };

        assert_eq!(labelled(&options, &source).label.as_deref(), Some("bird"));
    }

    #[test]
    fn texture_matches_bitmap_size() {
        let Some(gpu) = testing::gpu() else {
            return;
        };

        for (w, h) in [(1, 1), (63, 5), (64, 64), (65, 3), (300, 2)] {
            let bitmap = Bitmap::solid(w, h, [9, 8, 7, 6]).unwrap();
            let options = TextureOptions {
                format: Some(wgpu::TextureFormat::Rgba8Unorm),
                ..Default::default()
            };
            let texture =
                pollster::block_on(bitmap_to_texture(&gpu.device, &gpu.queue, &bitmap, &options))
                    .unwrap();

            assert_eq!(texture.width(), w);
            assert_eq!(texture.height(), h);
            assert_eq!(texture.depth_or_array_layers(), 1);
            assert_eq!(texture.usage(), DEFAULT_USAGE);
        }
    }

    #[test]
    fn usage_override_is_respected() {
        let Some(gpu) = testing::gpu() else {
            return;
        };

        let bitmap = Bitmap::solid(4, 4, [0; 4]).unwrap();
        let usage = wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC;
        let options = TextureOptions {
            format: Some(wgpu::TextureFormat::Rgba8Unorm),
            usage: Some(usage),
            label: Some("override".to_string()),
        };
        let texture =
            pollster::block_on(bitmap_to_texture(&gpu.device, &gpu.queue, &bitmap, &options))
                .unwrap();

        assert_eq!(texture.usage(), usage);
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let Some(gpu) = testing::gpu() else {
            return;
        };

        let too_wide = gpu.device.limits().max_texture_dimension_2d + 1;
        let bitmap = Bitmap {
            width: too_wide,
            height: 1,
            rgba: vec![0; too_wide as usize * 4],
        };
        let options = TextureOptions {
            format: Some(wgpu::TextureFormat::Rgba8Unorm),
            ..Default::default()
        };

        let res = pollster::block_on(bitmap_to_texture(&gpu.device, &gpu.queue, &bitmap, &options));
        assert!(matches!(res, Err(Error::TextureRejected(_))));
    }
}
