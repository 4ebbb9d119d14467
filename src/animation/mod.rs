pub(crate) mod manifest;
pub(crate) mod pool;
pub(crate) mod renderer;
pub(crate) mod stage;
pub(crate) mod worker;
