//! Shared utilities: the generic graph infrastructure and type descriptor helpers.

pub mod descriptor;
pub mod graph;
