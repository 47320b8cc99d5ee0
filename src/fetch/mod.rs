// src/fetch/mod.rs
//! Incremental DSIRE snapshot fetching.

pub mod checkpoint;
pub mod dates;
pub mod dsire;
pub mod update;

pub use dsire::DsireClient;
pub use update::{update_dsire, UpdateOptions};
