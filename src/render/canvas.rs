use crate::assets::decode::LayerRaster;
use crate::foundation::error::{OutfitError, OutfitResult};
use crate::foundation::math::mul_div255_u16;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for one premultiplied pixel, with `src` scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }
    let op = (opacity * 255.0).round() as u16;
    if op == 255 && src[3] == 255 {
        return src;
    }

    let sa = mul_div255_u16(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat(sa, mul_div255_u16(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u16(u16::from(src[i]), op);
        let dc = mul_div255_u16(u16::from(dst[i]), inv);
        out[i] = add_sat(sc, dc);
    }
    out
}

/// Source-over `src` onto `dst`, both equal-length premultiplied RGBA8 buffers.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> OutfitResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(OutfitError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Draw `layer` over `canvas` at full opacity. Both must have the same dimensions.
pub fn draw_over(canvas: &mut LayerRaster, layer: &LayerRaster) -> OutfitResult<()> {
    if (canvas.width, canvas.height) != (layer.width, layer.height) {
        return Err(OutfitError::render(format!(
            "layer is {}x{} but canvas is {}x{}",
            layer.width, layer.height, canvas.width, canvas.height
        )));
    }
    over_in_place(&mut canvas.rgba8_premul, &layer.rgba8_premul, 1.0)
}

fn add_sat(a: u16, b: u16) -> u8 {
    (a + b).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
