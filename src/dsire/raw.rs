// src/dsire/raw.rs
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use glob::{glob, Pattern};
use rayon::prelude::*;
use serde_json::Value;
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

use crate::config::ProjectPaths;

/// One upstream program record, kept untyped.
pub type RawRecord = Value;

/// Keys a wrapping object may hold the program list under, in lookup order.
const CONTAINER_KEYS: &[&str] = &["Programs", "results", "data", "items"];

const SNAPSHOT_PATTERN: &str = "dsire_programs_*.json.gz";

/// Flatten one parsed snapshot document into its program records.
///
/// - a list is used as-is
/// - an object yields the first list found under [`CONTAINER_KEYS`], or
///   itself as a single record
/// - anything else yields nothing
pub fn unwrap_document(doc: Value) -> Vec<RawRecord> {
    match doc {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in CONTAINER_KEYS {
                if matches!(map.get(*key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(*key) {
                        return items;
                    }
                }
            }
            vec![Value::Object(map)]
        }
        _ => Vec::new(),
    }
}

/// Snapshot files of one version, sorted by file name.
pub fn snapshot_files(dir: &Path) -> Result<Vec<PathBuf>> {
    // the directory is literal; only the file name part is a pattern
    let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy())).join(SNAPSHOT_PATTERN);
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("bad glob pattern {}", pattern))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn read_snapshot(path: &Path) -> Result<Vec<RawRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(GzDecoder::new(file));
    let doc: Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing JSON from {}", path.display()))?;
    let records = unwrap_document(doc);
    debug!(file = %path.display(), records = records.len(), "loaded snapshot");
    Ok(records)
}

/// Load every program record of `version_tag`, in file-name then in-file order.
///
/// A missing version directory yields no records; any unreadable or malformed
/// file fails the whole load.
#[instrument(level = "info", skip(paths), fields(root = %paths.root().display()))]
pub fn load_raw_dir(version_tag: &str, paths: &ProjectPaths) -> Result<Vec<RawRecord>> {
    let dir = paths.raw_version_dir(version_tag);
    if !dir.is_dir() {
        info!(dir = %dir.display(), "no raw snapshot directory");
        return Ok(Vec::new());
    }

    let files = snapshot_files(&dir)?;
    // indexed collect keeps file order regardless of scheduling
    let per_file: Vec<Vec<RawRecord>> = files
        .par_iter()
        .map(|p| read_snapshot(p))
        .collect::<Result<_>>()?;

    let records: Vec<RawRecord> = per_file.into_iter().flatten().collect();
    info!(files = files.len(), records = records.len(), "raw records loaded");
    Ok(records)
}

/// Version tags present under the raw DSIRE directory, sorted.
pub fn list_versions(paths: &ProjectPaths) -> Result<Vec<String>> {
    let dir = paths.raw_dsire_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use serde_json::json;
    use std::io::Write;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    pub(crate) fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,dervalue::dsire=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    pub(crate) fn write_gz(path: &Path, body: &str) -> Result<()> {
        fs::create_dir_all(path.parent().unwrap())?;
        let mut enc = GzEncoder::new(File::create(path)?, Compression::default());
        enc.write_all(body.as_bytes())?;
        enc.finish()?;
        Ok(())
    }

    #[test]
    fn unwrap_handles_each_shape() {
        assert_eq!(unwrap_document(json!([{"Id": 1}, {"Id": 2}])).len(), 2);
        assert_eq!(
            unwrap_document(json!({"results": [{"Id": 1}], "data": [{}, {}]})),
            vec![json!({"Id": 1})]
        );
        // non-list container value is not a match
        let single = json!({"data": "nope", "Id": 7});
        assert_eq!(unwrap_document(single.clone()), vec![single]);
        assert!(unwrap_document(json!(42)).is_empty());
    }

    #[test]
    fn missing_dir_is_empty() -> Result<()> {
        let tmp = tempdir()?;
        let paths = ProjectPaths::new(tmp.path());
        assert!(load_raw_dir("nope", &paths)?.is_empty());
        assert!(list_versions(&paths)?.is_empty());
        Ok(())
    }

    #[test]
    fn concatenates_in_file_name_order() -> Result<()> {
        let tmp = tempdir()?;
        let paths = ProjectPaths::new(tmp.path());
        let dir = paths.raw_version_dir("v1");
        write_gz(
            &dir.join("dsire_programs_20200201_20200229.json.gz"),
            r#"{"Programs": [{"Id": 3}]}"#,
        )?;
        write_gz(
            &dir.join("dsire_programs_20200101_20200131.json.gz"),
            r#"[{"Id": 1}, {"Id": 2}]"#,
        )?;
        write_gz(&dir.join("other.json.gz"), r#"[{"Id": 99}]"#)?;

        let recs = load_raw_dir("v1", &paths)?;
        let ids: Vec<i64> = recs.iter().map(|r| r["Id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(list_versions(&paths)?, vec!["v1".to_string()]);
        Ok(())
    }

    #[test]
    fn glob_characters_in_paths_are_literal() -> Result<()> {
        init_test_logging();
        let tmp = tempdir()?;
        for (root, tag) in [("plain", "v[1]"), ("proj[a]", "v1"), ("x*?", "v?")] {
            let paths = ProjectPaths::new(tmp.path().join(root));
            write_gz(
                &paths.raw_version_dir(tag).join("dsire_programs_0.json.gz"),
                r#"[{"Id": 1}]"#,
            )?;
            assert_eq!(load_raw_dir(tag, &paths)?.len(), 1, "root {} tag {}", root, tag);
        }
        Ok(())
    }

    #[test]
    fn malformed_file_fails_the_load() -> Result<()> {
        let tmp = tempdir()?;
        let paths = ProjectPaths::new(tmp.path());
        let dir = paths.raw_version_dir("bad");
        write_gz(&dir.join("dsire_programs_a.json.gz"), r#"[{"Id": 1}]"#)?;
        write_gz(&dir.join("dsire_programs_b.json.gz"), r#"[{"Id": "#)?;
        assert!(load_raw_dir("bad", &paths).is_err());
        Ok(())
    }
}
