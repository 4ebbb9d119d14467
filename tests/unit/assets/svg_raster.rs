use super::*;
use crate::assets::decode::parse_svg;

const HALF_BLUE: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10">
  <rect x="0" y="0" width="5" height="10" fill="#0000ff"/>
</svg>"##;

#[test]
fn rasterizes_at_every_output_size() {
    let tree = parse_svg(HALF_BLUE).unwrap();
    for size in OutfitSize::ALL {
        let raster = rasterize_svg(&tree, size).unwrap();
        let n = size.px();
        assert_eq!((raster.width, raster.height), (n, n));
        assert_eq!(raster.rgba8_premul.len(), (n * n * 4) as usize);
        assert_eq!(raster.pixel(n / 4, n / 2), Some([0, 0, 255, 255]));
        assert_eq!(raster.pixel(n - n / 4, n / 2), Some([0, 0, 0, 0]));
    }
}
