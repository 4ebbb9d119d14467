use std::io::Cursor;

use crate::foundation::core::OutfitSize;
use crate::foundation::error::{OutfitError, OutfitResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded layer pixels in premultiplied RGBA8 form.
pub struct LayerRaster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Vec<u8>,
}

impl LayerRaster {
    /// Fully transparent raster.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba8_premul: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Premultiplied pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.rgba8_premul.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Scale to exactly `size × size`, stretching to fill the frame.
    ///
    /// Resampling happens on premultiplied data so transparent edges do not bleed color.
    pub fn scaled_to(self, size: OutfitSize) -> OutfitResult<Self> {
        let n = size.px();
        if self.width == n && self.height == n {
            return Ok(self);
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, self.rgba8_premul)
            .ok_or_else(|| OutfitError::decode("raster buffer does not match its dimensions"))?;
        let resized = image::imageops::resize(&img, n, n, image::imageops::FilterType::Triangle);
        Ok(Self {
            width: n,
            height: n,
            rgba8_premul: resized.into_raw(),
        })
    }

    /// Encode as a straight-alpha RGBA8 PNG.
    pub fn encode_png(&self) -> OutfitResult<Vec<u8>> {
        let mut straight = self.rgba8_premul.clone();
        unpremultiply_rgba8_in_place(&mut straight);
        let img = image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| OutfitError::render("raster buffer does not match its dimensions"))?;

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| OutfitError::render(format!("encode png: {e}")))?;
        Ok(buf)
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> OutfitResult<LayerRaster> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| OutfitError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(OutfitError::decode("image has zero width or height"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(LayerRaster {
        width,
        height,
        rgba8_premul,
    })
}

/// Parse SVG bytes into a `usvg` tree.
pub fn parse_svg(bytes: &[u8]) -> OutfitResult<usvg::Tree> {
    let opts = usvg::Options::default();
    usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| OutfitError::decode(format!("parse svg tree: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
