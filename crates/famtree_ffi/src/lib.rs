//! Flutter bridge for the famtree core.

pub mod api;
