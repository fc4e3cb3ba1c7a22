pub(crate) mod limits;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod repos;
pub(crate) mod serve;
pub(crate) mod shared;
pub(crate) mod sync;
