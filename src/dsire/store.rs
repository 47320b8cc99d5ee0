// src/dsire/store.rs
use anyhow::{Context, Result};
use arrow::{
    csv::{ReaderBuilder, WriterBuilder},
    datatypes::SchemaRef,
    record_batch::RecordBatch,
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

use super::build::build_tables;
use super::table::{ParameterTable, ProgramTable};
use crate::config::ProjectPaths;

/// On-disk format of the processed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    #[default]
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// `(programs_<tag>.<ext>, parameters_<tag>.<ext>)` under the processed dir.
pub fn processed_files(
    paths: &ProjectPaths,
    version_tag: &str,
    format: OutputFormat,
) -> (PathBuf, PathBuf) {
    let dir = paths.processed_dir();
    let ext = format.extension();
    (
        dir.join(format!("programs_{}.{}", version_tag, ext)),
        dir.join(format!("parameters_{}.{}", version_tag, ext)),
    )
}

fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .with_context(|| format!("creating parquet writer for {}", path.display()))?;
    writer.write(batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?
        .build()?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("reading batches of {}", path.display()))
}

fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));
    writer
        .write(batch)
        .with_context(|| format!("writing {}", path.display()))?;
    writer
        .into_inner()
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

fn read_csv(path: &Path, schema: SchemaRef) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .build(file)
        .with_context(|| format!("creating csv reader for {}", path.display()))?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("reading rows of {}", path.display()))
}

fn write_batch(batch: &RecordBatch, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(batch, path),
        OutputFormat::Parquet => write_parquet(batch, path),
    }
}

/// Persist both tables for `version_tag`, returning the written paths.
#[instrument(level = "info", skip(programs, parameters, paths))]
pub fn write_tables(
    programs: &ProgramTable,
    parameters: &ParameterTable,
    paths: &ProjectPaths,
    version_tag: &str,
    format: OutputFormat,
) -> Result<(PathBuf, PathBuf)> {
    let dir = paths.processed_dir();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let (programs_path, parameters_path) = processed_files(paths, version_tag, format);
    write_batch(&programs.to_record_batch()?, &programs_path, format)?;
    write_batch(&parameters.to_record_batch()?, &parameters_path, format)?;
    info!(
        programs = programs.len(),
        parameters = parameters.len(),
        path = %programs_path.display(),
        "processed tables written"
    );
    Ok((programs_path, parameters_path))
}

/// Write a (usually filtered) programs table as CSV.
pub fn export_programs_csv(programs: &ProgramTable, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    write_csv(&programs.to_record_batch()?, path)
}

/// Rebuild from raw input and persist.
pub fn write_processed(
    version_tag: &str,
    paths: &ProjectPaths,
    format: OutputFormat,
) -> Result<(PathBuf, PathBuf)> {
    let (programs, parameters) = build_tables(version_tag, paths)?;
    write_tables(&programs, &parameters, paths, version_tag, format)
}

fn read_pair(
    paths: &ProjectPaths,
    version_tag: &str,
    format: OutputFormat,
) -> Result<Option<(ProgramTable, ParameterTable)>> {
    let (programs_path, parameters_path) = processed_files(paths, version_tag, format);
    if !(programs_path.is_file() && parameters_path.is_file()) {
        return Ok(None);
    }
    debug!(path = %programs_path.display(), "loading persisted tables");
    let (programs, parameters) = match format {
        OutputFormat::Parquet => (read_parquet(&programs_path)?, read_parquet(&parameters_path)?),
        OutputFormat::Csv => (
            read_csv(&programs_path, ProgramTable::schema())?,
            read_csv(&parameters_path, ParameterTable::schema())?,
        ),
    };
    Ok(Some((
        ProgramTable::from_batches(&programs)
            .with_context(|| format!("decoding {}", programs_path.display()))?,
        ParameterTable::from_batches(&parameters)
            .with_context(|| format!("decoding {}", parameters_path.display()))?,
    )))
}

/// Persisted tables for `version_tag`: the Parquet pair if present, else the
/// CSV pair, else `None`.
pub fn load_processed(
    version_tag: &str,
    paths: &ProjectPaths,
) -> Result<Option<(ProgramTable, ParameterTable)>> {
    if let Some(tables) = read_pair(paths, version_tag, OutputFormat::Parquet)? {
        return Ok(Some(tables));
    }
    read_pair(paths, version_tag, OutputFormat::Csv)
}

/// Persisted tables when available, otherwise a fresh build (not written back).
#[instrument(level = "info", skip(paths))]
pub fn load_or_build(
    version_tag: &str,
    paths: &ProjectPaths,
) -> Result<(ProgramTable, ParameterTable)> {
    if let Some(tables) = load_processed(version_tag, paths)? {
        return Ok(tables);
    }
    info!("no processed tables; building from raw snapshot");
    build_tables(version_tag, paths)
}
