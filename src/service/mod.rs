pub(crate) mod allow_list;
pub(crate) mod handlers;
pub(crate) mod http;
pub(crate) mod opts;
