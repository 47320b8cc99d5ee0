// src/dsire/mod.rs
//! DSIRE incentive programs: raw snapshot loading, flattening into the
//! programs/parameters tables, persistence and browsing.

pub mod build;
pub mod dates;
pub mod extract;
pub mod filter;
pub mod labels;
pub mod raw;
pub mod rows;
pub mod store;
pub mod table;
pub mod text;

pub use build::{build_tables, TableBuilder};
pub use labels::DetailLabels;
pub use raw::{list_versions, load_raw_dir, RawRecord};
pub use rows::{ParameterRow, ParameterSource, ProgramId, ProgramRow};
pub use store::{load_or_build, load_processed, write_processed, write_tables, OutputFormat};
pub use table::{ParameterTable, ProgramTable};
