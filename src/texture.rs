//! Texture payloads and the compressed format table

use image::imageops::FilterType;
use image::RgbaImage;

/// Supported texture formats with compression and quality characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Uncompressed RGBA with sRGB color space
    Rgba8Srgb,

    /// Uncompressed RGB (no alpha)
    Rgb8Srgb,

    /// RGBA quantized to 4 bits per channel
    Rgba4Unorm,

    /// KTX2 with UASTC compression (excellent quality)
    Ktx2Uastc,

    /// KTX2 with ETC1S compression (smallest, visible artifacts)
    Ktx2Etc1s,
}

impl TextureFormat {
    /// Formats the optimizer may pick, least lossy first
    pub const COMPRESSED: [TextureFormat; 3] = [
        TextureFormat::Rgba4Unorm,
        TextureFormat::Ktx2Uastc,
        TextureFormat::Ktx2Etc1s,
    ];

    /// Storage cost per texel
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            Self::Rgba8Srgb => 32,
            Self::Rgb8Srgb => 24,
            Self::Rgba4Unorm => 16,
            Self::Ktx2Uastc => 8,
            Self::Ktx2Etc1s => 4,
        }
    }

    /// Check if this format is compressed
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::Rgba8Srgb | Self::Rgb8Srgb)
    }

    /// Get the size relative to uncompressed RGBA
    pub fn size_reduction(&self) -> f32 {
        self.bits_per_pixel() as f32 / 32.0
    }

    /// Approximate perceptual loss introduced by encoding into this format
    pub fn quality_loss(&self) -> f32 {
        match self {
            Self::Rgba8Srgb | Self::Rgb8Srgb => 0.0,
            Self::Rgba4Unorm => 0.05,
            Self::Ktx2Uastc => 0.08,
            Self::Ktx2Etc1s => 0.2,
        }
    }

    /// Get the relative GPU upload speed (higher is better)
    pub fn upload_speed(&self) -> f32 {
        match self {
            Self::Rgba8Srgb | Self::Rgb8Srgb => 1.0,
            Self::Rgba4Unorm => 1.8,
            Self::Ktx2Uastc => 2.5,
            Self::Ktx2Etc1s => 3.0,
        }
    }

    /// Pick the least lossy compressed format that reaches `target_ratio`
    /// without exceeding `max_quality_loss`.
    ///
    /// Falls back to the smallest format within the quality bound, or `None`
    /// when no compressed format is acceptable.
    pub fn recommended(target_ratio: f32, max_quality_loss: f32) -> Option<Self> {
        let allowed: Vec<TextureFormat> = Self::COMPRESSED
            .into_iter()
            .filter(|f| f.quality_loss() <= max_quality_loss)
            .collect();

        allowed
            .iter()
            .copied()
            .find(|f| f.size_reduction() <= target_ratio)
            .or_else(|| allowed.last().copied())
    }
}

/// A decoded texture
///
/// `data` may be empty for descriptor-only textures whose pixels live
/// elsewhere (GPU-resident, streamed).
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub mip_levels: u32,
    pub data: Vec<u8>,
}

impl TextureData {
    /// Descriptor-only RGBA8 texture
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Srgb,
            mip_levels: 1,
            data: Vec::new(),
        }
    }

    /// RGBA8 texture with pixel data
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Srgb,
            mip_levels: 1,
            data,
        }
    }

    /// Get the estimated size of this texture in bytes, mip chain included
    pub fn estimated_size(&self) -> usize {
        let mut size = 0u64;
        let (mut w, mut h) = (self.width as u64, self.height as u64);
        for _ in 0..self.mip_levels.max(1) {
            size += w * h * self.format.bits_per_pixel() as u64 / 8;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        size as usize
    }

    pub fn has_pixels(&self) -> bool {
        !self.data.is_empty()
    }

    /// Downscale by `levels` halvings, never below `min_dimension`.
    ///
    /// Pixel data is resampled when present and stored as RGBA8.
    pub fn downscaled(&self, levels: u32, min_dimension: u32) -> TextureData {
        let mut width = self.width;
        let mut height = self.height;
        for _ in 0..levels {
            if width / 2 < min_dimension || height / 2 < min_dimension {
                break;
            }
            width /= 2;
            height /= 2;
        }

        let data = match self.rgba_image() {
            Some(img) if (width, height) != (self.width, self.height) => {
                image::imageops::resize(&img, width, height, FilterType::Triangle).into_raw()
            }
            _ => self.data.clone(),
        };

        TextureData {
            width,
            height,
            format: self.format,
            mip_levels: self.mip_levels,
            data,
        }
    }

    /// Re-encode into `format`.
    ///
    /// RGBA8 pixels are quantized to 4 bits per channel; block formats need
    /// an external encoder, so pixel data is quantized the same way and the
    /// target format is recorded only for descriptor-only textures.
    pub fn encoded(&self, format: TextureFormat) -> TextureData {
        if !self.has_pixels() {
            return TextureData {
                format,
                ..self.clone()
            };
        }

        match self.format {
            TextureFormat::Rgba8Srgb => TextureData {
                width: self.width,
                height: self.height,
                format: self.encoded_format(format),
                mip_levels: self.mip_levels,
                data: quantize_rgba4(&self.data),
            },
            _ => self.clone(),
        }
    }

    /// Format that [`encoded`](Self::encoded) produces when asked for
    /// `requested`; only RGBA4 is encoded from real pixels
    pub fn encoded_format(&self, requested: TextureFormat) -> TextureFormat {
        if !self.has_pixels() {
            return requested;
        }
        match self.format {
            TextureFormat::Rgba8Srgb => TextureFormat::Rgba4Unorm,
            other => other,
        }
    }

    fn rgba_image(&self) -> Option<RgbaImage> {
        if self.format != TextureFormat::Rgba8Srgb || !self.has_pixels() {
            return None;
        }
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Pack RGBA8 texels into two bytes each (4 bits per channel)
fn quantize_rgba4(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [(px[0] & 0xF0) | (px[1] >> 4), (px[2] & 0xF0) | (px[3] >> 4)])
        .collect()
}
