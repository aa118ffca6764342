//! Various utilities

pub mod deferred_delete;
