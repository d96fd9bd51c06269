use image::imageops::FilterType;
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::intake::DecodedImage;

use super::context::SurfaceColorSpace;

/// Upper bound on mip levels allocated per image, base level included.
pub(crate) const MAX_MIP_LEVELS: u32 = 3;

/// Deepest level the sampler may select.
const MAX_LOD: f32 = (MAX_MIP_LEVELS - 1) as f32;

/// Mip levels for an image: the full chain down to 1x1, capped at
/// [`MAX_MIP_LEVELS`].
pub(crate) fn mip_level_count(width: u32, height: u32) -> u32 {
    let longest = width.max(height).max(1);
    let full_chain = u32::BITS - longest.leading_zeros();
    full_chain.min(MAX_MIP_LEVELS)
}

pub(crate) fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

/// Downsampled levels 1..`level_count`, each filtered from the previous one.
pub(crate) fn mip_chain(base: &RgbaImage, level_count: u32) -> Vec<RgbaImage> {
    let mut levels: Vec<RgbaImage> = Vec::with_capacity(level_count.saturating_sub(1) as usize);
    for level in 1..level_count {
        let (width, height) = mip_extent(base.width(), base.height(), level);
        let previous = levels.last().unwrap_or(base);
        let next = image::imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Largest size with the same aspect ratio whose longest side fits in
/// `max_dimension`. Images already within the limit are returned unchanged.
pub(crate) fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width.max(1), height.max(1));
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    let shrink = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_dimension);
    (shrink(width), shrink(height))
}

/// What an incoming image needs from the GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UploadPlan {
    /// No image texture exists yet.
    Allocate,
    /// Same dimensions; overwrite every level in place.
    Reuse,
    /// Dimensions changed; release the old texture first.
    Reallocate,
}

impl UploadPlan {
    pub fn for_image(current: Option<(u32, u32)>, incoming: (u32, u32)) -> Self {
        match current {
            None => UploadPlan::Allocate,
            Some(size) if size == incoming => UploadPlan::Reuse,
            Some(_) => UploadPlan::Reallocate,
        }
    }
}

fn texture_format(color_space: SurfaceColorSpace) -> wgpu::TextureFormat {
    match color_space {
        SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

struct ImageTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    mip_levels: u32,
}

impl ImageTexture {
    fn allocate(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let mip_levels = mip_level_count(width, height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("image texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
            mip_levels,
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn upload(&self, queue: &wgpu::Queue, pixels: &RgbaImage) {
        self.write_level(queue, 0, pixels);
        for (index, level) in mip_chain(pixels, self.mip_levels).iter().enumerate() {
            self.write_level(queue, index as u32 + 1, level);
        }
    }

    fn write_level(&self, queue: &wgpu::Queue, mip_level: u32, pixels: &RgbaImage) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * pixels.width()),
                rows_per_image: Some(pixels.height()),
            },
            wgpu::Extent3d {
                width: pixels.width(),
                height: pixels.height(),
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Owns the single image texture, its sampler and the placeholder bound
/// until the first image arrives.
pub(crate) struct TextureManager {
    format: wgpu::TextureFormat,
    sampler: wgpu::Sampler,
    placeholder: wgpu::TextureView,
    current: Option<ImageTexture>,
    max_dimension: u32,
}

impl TextureManager {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_space: SurfaceColorSpace,
        max_dimension: u32,
    ) -> Self {
        let format = texture_format(color_space);
        let placeholder = device
            .create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("placeholder image texture"),
                    size: wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                TextureDataOrder::LayerMajor,
                &[0, 0, 0, 255],
            )
            .create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("image sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            lod_min_clamp: 0.0,
            lod_max_clamp: MAX_LOD,
            ..Default::default()
        });

        Self {
            format,
            sampler,
            placeholder,
            current: None,
            max_dimension,
        }
    }

    /// Uploads `image`, reusing the texture when the size is unchanged.
    /// Images larger than the device allows are downscaled first.
    /// Returns true when the bound view changed and bind groups must be
    /// rebuilt.
    pub fn update_image(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &DecodedImage,
    ) -> bool {
        let incoming = fit_within(image.width(), image.height(), self.max_dimension);
        let downscaled = (incoming != (image.width(), image.height())).then(|| {
            tracing::warn!(
                path = %image.path.display(),
                width = image.width(),
                height = image.height(),
                max = self.max_dimension,
                "image exceeds the GPU texture limit; downscaling"
            );
            image::imageops::resize(&image.pixels, incoming.0, incoming.1, FilterType::Triangle)
        });
        let pixels = downscaled.as_ref().unwrap_or(&image.pixels);
        let plan = UploadPlan::for_image(self.current.as_ref().map(ImageTexture::size), incoming);
        if plan != UploadPlan::Reuse {
            if let Some(previous) = self.current.take() {
                previous.texture.destroy();
            }
            self.current = Some(ImageTexture::allocate(
                device,
                self.format,
                incoming.0,
                incoming.1,
            ));
        }
        if let Some(texture) = &self.current {
            texture.upload(queue, pixels);
            tracing::debug!(
                ?plan,
                width = incoming.0,
                height = incoming.1,
                mip_levels = texture.mip_levels,
                "uploaded image texture"
            );
        }
        plan != UploadPlan::Reuse
    }

    pub fn view(&self) -> &wgpu::TextureView {
        self.current
            .as_ref()
            .map(|texture| &texture.view)
            .unwrap_or(&self.placeholder)
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn mip_levels_are_capped() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(3, 3), 2);
        assert_eq!(mip_level_count(4, 4), 3);
        assert_eq!(mip_level_count(4000, 3000), MAX_MIP_LEVELS);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn mip_extent_never_reaches_zero() {
        assert_eq!(mip_extent(640, 480, 1), (320, 240));
        assert_eq!(mip_extent(640, 1, 2), (160, 1));
    }

    #[test]
    fn mip_chain_halves_each_level() {
        let base = RgbaImage::from_pixel(8, 4, Rgba([200, 100, 50, 255]));
        let chain = mip_chain(&base, mip_level_count(8, 4));
        let sizes: Vec<(u32, u32)> = chain.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, [(4, 2), (2, 1)]);
        // a flat colour survives filtering
        assert_eq!(chain[1].get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn oversized_images_fit_the_texture_limit() {
        assert_eq!(fit_within(20_000, 4_000, 8_192), (8_192, 1_638));
        assert_eq!(fit_within(4_000, 20_000, 8_192), (1_638, 8_192));
        assert_eq!(fit_within(8_192, 8_192, 8_192), (8_192, 8_192));
        assert_eq!(fit_within(640, 480, 8_192), (640, 480));
        assert_eq!(fit_within(100_000, 1, 2_048), (2_048, 1));
    }

    #[test]
    fn upload_plan_tracks_dimensions() {
        assert_eq!(UploadPlan::for_image(None, (10, 10)), UploadPlan::Allocate);
        assert_eq!(
            UploadPlan::for_image(Some((10, 10)), (10, 10)),
            UploadPlan::Reuse
        );
        assert_eq!(
            UploadPlan::for_image(Some((10, 10)), (10, 11)),
            UploadPlan::Reallocate
        );
    }
}
