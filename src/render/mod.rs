pub(crate) mod cache;
pub(crate) mod canvas;
pub(crate) mod compositor;
