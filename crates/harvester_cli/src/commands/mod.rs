pub(crate) mod code;
pub(crate) mod details;
pub(crate) mod intersect;
pub(crate) mod meta;
pub(crate) mod shared;
pub(crate) mod stars;
pub(crate) mod tree;
