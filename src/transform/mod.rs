//! Transform adapters from upstream API shapes into report models, plus the
//! name-matching and aggregation logic the shortage workflows are built on.

pub(crate) mod batch;
pub(crate) mod normalize;
pub(crate) mod shortage;
pub(crate) mod trends;
