pub(crate) mod sweeper;
