// src/fetch/update.rs
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use flate2::{write::GzEncoder, Compression};
use serde_json::Value;
use std::{io::Write, path::PathBuf, time::Duration};
use tokio::{fs, time::sleep};
use tracing::{info, instrument};

use super::checkpoint::{load_state, save_state};
use super::dates::{month_chunks, parse_yyyymmdd, yyyymmdd};
use super::dsire::DsireClient;
use crate::config::ProjectPaths;

/// Pulls before this date are never requested.
pub const EARLIEST_START: &str = "20100101";

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub version_tag: String,
    /// Defaults to the saved checkpoint, then [`EARLIEST_START`].
    pub start: Option<NaiveDate>,
    /// Defaults to today (UTC).
    pub end: Option<NaiveDate>,
    /// Pause between windows.
    pub pause: Duration,
}

/// One month window and the snapshot file it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: String,
    pub end: String,
    pub path: PathBuf,
}

/// Resolved range plus the windows still missing on disk.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub end: NaiveDate,
    pub windows: Vec<FetchWindow>,
    pub skipped: usize,
}

pub fn plan_update(paths: &ProjectPaths, opts: &UpdateOptions, today: NaiveDate) -> Result<FetchPlan> {
    let end = opts.end.unwrap_or(today);
    let start = match opts.start {
        Some(d) => d,
        None => {
            let saved = load_state(&paths.dsire_state_file())?.map(|s| s.last_end);
            parse_yyyymmdd(saved.as_deref().unwrap_or(EARLIEST_START))?
        }
    };

    let out_dir = paths.raw_version_dir(&opts.version_tag);
    let mut windows = Vec::new();
    let mut skipped = 0;
    for (s, e) in month_chunks(start, end) {
        let (s, e) = (yyyymmdd(s), yyyymmdd(e));
        let path = out_dir.join(format!("dsire_programs_{}_{}.json.gz", s, e));
        if path.exists() {
            skipped += 1;
            continue;
        }
        windows.push(FetchWindow {
            start: s,
            end: e,
            path,
        });
    }
    Ok(FetchPlan {
        end,
        windows,
        skipped,
    })
}

fn gzip_json(doc: &Value) -> Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut enc, doc).context("serializing snapshot")?;
    enc.flush()?;
    Ok(enc.finish()?)
}

/// Fetch every missing month window into the version's raw directory, then
/// advance the checkpoint to the range end.
#[instrument(level = "info", skip(client, paths, opts), fields(version = %opts.version_tag))]
pub async fn update_dsire(
    client: &DsireClient,
    paths: &ProjectPaths,
    opts: &UpdateOptions,
) -> Result<Vec<PathBuf>> {
    let plan = plan_update(paths, opts, Utc::now().date_naive())?;
    let out_dir = paths.raw_version_dir(&opts.version_tag);
    fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;
    info!(
        windows = plan.windows.len(),
        skipped = plan.skipped,
        dir = %out_dir.display(),
        "fetching DSIRE programs"
    );

    let mut written = Vec::with_capacity(plan.windows.len());
    for window in &plan.windows {
        let doc = client
            .get_programs_by_date(&window.start, &window.end)
            .await?;
        fs::write(&window.path, gzip_json(&doc)?)
            .await
            .with_context(|| format!("writing {}", window.path.display()))?;
        info!(file = %window.path.display(), "wrote snapshot");
        written.push(window.path.clone());
        if !opts.pause.is_zero() {
            sleep(opts.pause).await;
        }
    }

    save_state(&paths.dsire_state_file(), &yyyymmdd(plan.end))?;
    info!("DSIRE update done");
    Ok(written)
}
