// src/markets/gridstatus.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::models::EnergyInterval;
use crate::config::GridStatusConfig;

/// Market code → GridStatus dataset id.
const MARKET_DATASETS: &[(&str, &str)] = &[("DA", "pjm_lmp_day_ahead_hourly")];

const PAGE_SIZE: u32 = 10_000;

pub fn dataset_for(market: &str) -> Result<&'static str> {
    let m = market.to_ascii_uppercase();
    MARKET_DATASETS
        .iter()
        .find(|(code, _)| *code == m)
        .map(|(_, id)| *id)
        .ok_or_else(|| {
            let known: Vec<_> = MARKET_DATASETS.iter().map(|(c, _)| *c).collect();
            anyhow!("unsupported market {:?}; known: {:?}", market, known)
        })
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<LmpRecord>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default, rename = "hasNextPage")]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct LmpRecord {
    interval_start_utc: DateTime<Utc>,
    interval_end_utc: DateTime<Utc>,
    #[serde(default)]
    location: Option<String>,
    lmp: Option<f64>,
    #[serde(default)]
    congestion: Option<f64>,
    #[serde(default)]
    loss: Option<f64>,
}

impl LmpRecord {
    fn into_interval(self, market: &str, location: &str) -> Option<EnergyInterval> {
        Some(EnergyInterval {
            interval_start_utc: self.interval_start_utc,
            interval_end_utc: self.interval_end_utc,
            market: market.to_string(),
            location: self.location.unwrap_or_else(|| location.to_string()),
            lmp: self.lmp.filter(|v| v.is_finite())?,
            congestion: self.congestion,
            loss: self.loss,
        })
    }
}

/// PJM prices through the GridStatus hosted datasets API.
#[derive(Debug, Clone)]
pub struct GridStatusClient {
    http: Client,
    config: GridStatusConfig,
}

impl GridStatusClient {
    pub fn new(config: GridStatusConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("GridStatus API key is required");
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent("der-value-db")
            .build()
            .context("building GridStatus http client")?;
        Ok(Self { http, config })
    }

    /// Hourly LMPs for one pricing node over `start..=end` (whole days).
    #[instrument(level = "info", skip(self))]
    pub async fn lmp_hourly(
        &self,
        market: &str,
        start: NaiveDate,
        end: NaiveDate,
        location: &str,
    ) -> Result<Vec<EnergyInterval>> {
        let dataset = dataset_for(market)?;
        let url = format!(
            "{}/datasets/{}/query",
            self.config.base_url.trim_end_matches('/'),
            dataset
        );
        let start_time = format!("{}T00:00:00Z", start.format("%Y-%m-%d"));
        let end_time = format!("{}T23:59:59Z", end.format("%Y-%m-%d"));
        let market = market.to_ascii_uppercase();

        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let resp: Page = self
                .http
                .get(&url)
                .header("x-api-key", &self.config.api_key)
                .query(&[
                    ("start_time", start_time.as_str()),
                    ("end_time", end_time.as_str()),
                    ("filter_column", "location"),
                    ("filter_value", location),
                    ("timezone", "market"),
                ])
                .query(&[("page", page), ("page_size", PAGE_SIZE)])
                .send()
                .await
                .with_context(|| format!("GET {}", url))?
                .error_for_status()?
                .json()
                .await
                .with_context(|| format!("decoding page {} of {}", page, dataset))?;

            debug!(page, rows = resp.data.len(), "GridStatus page");
            out.extend(
                resp.data
                    .into_iter()
                    .filter_map(|r| r.into_interval(&market, location)),
            );
            if !resp.meta.has_next_page {
                break;
            }
            page += 1;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_markets_only() {
        assert_eq!(dataset_for("da").unwrap(), "pjm_lmp_day_ahead_hourly");
        assert!(dataset_for("RT").is_err());
    }

    #[test]
    fn api_key_required() {
        assert!(GridStatusClient::new(GridStatusConfig::new("  ")).is_err());
        assert!(GridStatusClient::new(GridStatusConfig::new("k3y")).is_ok());
    }

    #[test]
    fn decodes_query_page() {
        let body = r#"{
            "data": [
                {"interval_start_utc": "2025-06-01T04:00:00+00:00",
                 "interval_end_utc": "2025-06-01T05:00:00+00:00",
                 "location": "PJM-RTO", "lmp": 31.5, "energy": 31.0,
                 "congestion": 0.4, "loss": 0.1},
                {"interval_start_utc": "2025-06-01T05:00:00+00:00",
                 "interval_end_utc": "2025-06-01T06:00:00+00:00",
                 "location": "PJM-RTO", "lmp": null}
            ],
            "meta": {"page": 1, "hasNextPage": false}
        }"#;
        let page: Page = serde_json::from_str(body).unwrap();
        assert!(!page.meta.has_next_page);
        let rows: Vec<_> = page
            .data
            .into_iter()
            .filter_map(|r| r.into_interval("DA", "PJM-RTO"))
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lmp, 31.5);
        assert_eq!(rows[0].hours(), 1.0);
    }
}
