pub(crate) mod decode;
pub(crate) mod fetch;
pub(crate) mod resolve;
pub(crate) mod svg_raster;
