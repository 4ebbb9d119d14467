use std::collections::HashMap;

use resvg::tiny_skia;

use crate::animation::manifest::AnimationManifest;
use crate::assets::decode::{LayerRaster, decode_image};
use crate::assets::fetch::LayerFetcher;
use crate::foundation::core::{Affine, OutfitSize};
use crate::foundation::error::{OutfitError, OutfitResult};

/// Fetch a manifest and render its first frame at `size × size`.
#[tracing::instrument(skip(fetcher))]
pub fn render_manifest_url(
    fetcher: &dyn LayerFetcher,
    manifest_url: &str,
    size: OutfitSize,
) -> OutfitResult<LayerRaster> {
    let bytes = fetcher.fetch(manifest_url)?;
    let manifest = AnimationManifest::parse(&bytes)?;
    render_first_frame(fetcher, &manifest, manifest_url, size)
}

/// Draw the first frame's placements, in order, onto a transparent stage scaled to the output.
///
/// Sprites are drawn straight into output space (stage transform folded into each placement), so
/// nothing is resampled twice.
pub fn render_first_frame(
    fetcher: &dyn LayerFetcher,
    manifest: &AnimationManifest,
    manifest_url: &str,
    size: OutfitSize,
) -> OutfitResult<LayerRaster> {
    let sprites = fetch_sprites(fetcher, manifest, manifest_url)?;

    let n = size.px();
    let mut stage = tiny_skia::Pixmap::new(n, n)
        .ok_or_else(|| OutfitError::render("failed to allocate stage pixmap"))?;
    let to_output = Affine::scale_non_uniform(
        f64::from(n) / f64::from(manifest.width),
        f64::from(n) / f64::from(manifest.height),
    );

    for p in &manifest.first_frame()?.placements {
        let sprite = sprites.get(p.sprite.as_str()).ok_or_else(|| {
            OutfitError::decode(format!("sprite '{}' was not loaded", p.sprite))
        })?;
        let paint = tiny_skia::PixmapPaint {
            opacity: p.alpha as f32,
            blend_mode: tiny_skia::BlendMode::SourceOver,
            quality: tiny_skia::FilterQuality::Bilinear,
        };
        stage.draw_pixmap(
            0,
            0,
            sprite.as_ref(),
            &paint,
            to_skia_transform(to_output * p.transform()),
            None,
        );
    }

    Ok(LayerRaster {
        width: n,
        height: n,
        rgba8_premul: stage.take(),
    })
}

const SPRITE_FETCH_THREADS: usize = 8;

// Sprite fetches run on scoped threads rather than the compositor's rayon pool: this code runs
// on stage worker threads that rayon tasks may be blocked waiting on. Each thread takes every
// `SPRITE_FETCH_THREADS`-th sprite.
fn fetch_sprites(
    fetcher: &dyn LayerFetcher,
    manifest: &AnimationManifest,
    manifest_url: &str,
) -> OutfitResult<HashMap<String, tiny_skia::Pixmap>> {
    let urls = manifest.first_frame_sprite_urls(manifest_url)?;
    let threads = urls.len().min(SPRITE_FETCH_THREADS);
    let urls = &urls;

    let batches: Vec<OutfitResult<Vec<(String, tiny_skia::Pixmap)>>> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|first| {
                    scope.spawn(move || {
                        urls.iter()
                            .skip(first)
                            .step_by(threads)
                            .map(|(id, url)| -> OutfitResult<(String, tiny_skia::Pixmap)> {
                                let raster = decode_image(&fetcher.fetch(url)?)?;
                                Ok((id.clone(), raster_to_pixmap(raster)?))
                            })
                            .collect::<OutfitResult<Vec<_>>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(OutfitError::render("sprite fetch thread panicked")))
                })
                .collect()
        });

    // A manifest with a missing sprite cannot be drawn faithfully; fail the whole layer.
    let mut sprites = HashMap::with_capacity(urls.len());
    for batch in batches {
        sprites.extend(batch?);
    }
    Ok(sprites)
}

fn raster_to_pixmap(raster: LayerRaster) -> OutfitResult<tiny_skia::Pixmap> {
    let size = tiny_skia::IntSize::from_wh(raster.width, raster.height)
        .ok_or_else(|| OutfitError::decode("sprite has zero width or height"))?;
    tiny_skia::Pixmap::from_vec(raster.rgba8_premul, size)
        .ok_or_else(|| OutfitError::decode("sprite buffer does not match its dimensions"))
}

fn to_skia_transform(affine: Affine) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    tiny_skia::Transform::from_row(
        a as f32, b as f32, c as f32, d as f32, e as f32, f as f32,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/animation/stage.rs"]
mod tests;
