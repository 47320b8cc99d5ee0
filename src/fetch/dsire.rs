// src/fetch/dsire.rs
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::DsireClientConfig;

/// Thin client for the DSIRE programs API.
///
/// - `GET {base}/getprograms/json`
/// - `GET {base}/getprogramsbydate/{YYYYMMDD}/{YYYYMMDD}/json`
#[derive(Debug, Clone)]
pub struct DsireClient {
    http: Client,
    base: String,
    config: DsireClientConfig,
}

impl DsireClient {
    pub fn new(config: DsireClientConfig) -> Result<Self> {
        Url::parse(&config.base_url)
            .with_context(|| format!("parsing DSIRE base URL {}", config.base_url))?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("building DSIRE http client")?;
        Ok(Self {
            http,
            base: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn all_programs_url(&self) -> String {
        format!("{}/getprograms/json", self.base)
    }

    pub fn programs_by_date_url(&self, start_yyyymmdd: &str, end_yyyymmdd: &str) -> String {
        format!(
            "{}/getprogramsbydate/{}/{}/json",
            self.base, start_yyyymmdd, end_yyyymmdd
        )
    }

    pub async fn get_programs_all(&self) -> Result<Value> {
        self.request(&self.all_programs_url()).await
    }

    pub async fn get_programs_by_date(&self, start_yyyymmdd: &str, end_yyyymmdd: &str) -> Result<Value> {
        self.request(&self.programs_by_date_url(start_yyyymmdd, end_yyyymmdd))
            .await
    }

    async fn try_once(&self, url: &str) -> Result<Value> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }

    /// GET with linear back-off; the final failure propagates.
    async fn request(&self, url: &str) -> Result<Value> {
        let max = self.config.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_once(url).await {
                Ok(v) => {
                    debug!(url, attempt, "DSIRE response received");
                    return Ok(v);
                }
                Err(e) if attempt < max => {
                    warn!(url, attempt, error = %e, "DSIRE request failed; retrying");
                    sleep(self.config.backoff * attempt).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("GET {} after {} attempts", url, attempt))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn endpoint_urls() -> Result<()> {
        let client = DsireClient::new(DsireClientConfig {
            base_url: "http://example.test/api/v1/".into(),
            ..Default::default()
        })?;
        assert_eq!(
            client.all_programs_url(),
            "http://example.test/api/v1/getprograms/json"
        );
        assert_eq!(
            client.programs_by_date_url("20240101", "20240131"),
            "http://example.test/api/v1/getprogramsbydate/20240101/20240131/json"
        );
        Ok(())
    }

    #[test]
    fn rejects_bad_base_url() {
        let cfg = DsireClientConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(DsireClient::new(cfg).is_err());
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        // nothing listens on port 9 of the loopback interface
        let client = DsireClient::new(DsireClientConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_secs(2),
            max_retries: 2,
            backoff: Duration::from_millis(1),
            ..Default::default()
        })
        .unwrap();
        let err = client.get_programs_all().await.unwrap_err();
        assert!(format!("{:#}", err).contains("after 2 attempts"));
    }
}
