pub(crate) mod bound;
pub(crate) mod controller;
pub(crate) mod request;
pub(crate) mod validate;
