use crate::assets::decode::LayerRaster;
use crate::foundation::core::OutfitSize;
use crate::foundation::error::{OutfitError, OutfitResult};

/// Rasterize an SVG tree directly at the final output size.
///
/// The document is stretched to fill `size × size`; rasterizing at the target resolution (rather
/// than scaling an intermediate bitmap) keeps edges sharp at every size.
pub fn rasterize_svg(tree: &usvg::Tree, size: OutfitSize) -> OutfitResult<LayerRaster> {
    let n = size.px();
    let doc = tree.size();
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if !valid(doc.width()) || !valid(doc.height()) {
        return Err(OutfitError::decode("svg has invalid width/height"));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(n, n)
        .ok_or_else(|| OutfitError::render("failed to allocate svg pixmap"))?;

    let sx = (n as f32) / doc.width();
    let sy = (n as f32) / doc.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(LayerRaster {
        width: n,
        height: n,
        rgba8_premul: pixmap.take(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/svg_raster.rs"]
mod tests;
