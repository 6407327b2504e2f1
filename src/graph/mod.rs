pub(crate) mod kind;
pub(crate) mod model;
pub(crate) mod param;
pub(crate) mod plan;
