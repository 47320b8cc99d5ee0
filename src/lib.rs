pub mod config;
pub mod dsire;
pub mod fetch;
pub mod markets;
