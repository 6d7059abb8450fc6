pub(crate) mod catalog;
pub(crate) mod dry_run;
pub(crate) mod limits;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod runs;
pub(crate) mod sync;
