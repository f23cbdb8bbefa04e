pub(crate) mod lookup;
pub(crate) mod shared;
pub(crate) mod status;
pub(crate) mod sync;
