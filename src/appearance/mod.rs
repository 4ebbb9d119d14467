pub(crate) mod catalog;
pub(crate) mod model;
pub(crate) mod visibility;
