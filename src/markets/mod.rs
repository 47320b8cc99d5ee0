// src/markets/mod.rs
//! PJM market prices and revenue estimation.

pub mod gridstatus;
pub mod models;
pub mod revenue;

pub use gridstatus::GridStatusClient;
