// src/fetch/checkpoint.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Last fetched window end, persisted between incremental pulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchState {
    /// YYYYMMDD
    pub last_end: String,
}

pub fn load_state(path: &Path) -> Result<Option<FetchState>> {
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let state = serde_json::from_str(&body).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(state))
}

pub fn save_state(path: &Path, last_end: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_string(&FetchState {
        last_end: last_end.to_string(),
    })?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("meta/state/dsire_last_pull.json");
        assert_eq!(load_state(&path)?, None);

        save_state(&path, "20240131")?;
        assert_eq!(fs::read_to_string(&path)?, r#"{"last_end":"20240131"}"#);
        assert_eq!(
            load_state(&path)?.map(|s| s.last_end).as_deref(),
            Some("20240131")
        );
        Ok(())
    }
}
