// src/markets/models.rs
//! PJM market price records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hourly LMP interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyInterval {
    pub interval_start_utc: DateTime<Utc>,
    pub interval_end_utc: DateTime<Utc>,
    /// "DA" or "RT"
    pub market: String,
    /// pricing node / hub
    pub location: String,
    /// $/MWh
    pub lmp: f64,
    pub congestion: Option<f64>,
    pub loss: Option<f64>,
}

impl EnergyInterval {
    pub fn hours(&self) -> f64 {
        (self.interval_end_utc - self.interval_start_utc).num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationPrice {
    pub ts: DateTime<Utc>,
    /// capability clearing price, $/MW-h
    pub rmccp: f64,
    /// performance (mileage) clearing price, $/ΔMW
    pub rmpcp: Option<f64>,
    pub mileage_ratio: Option<f64>,
    /// REG-A / REG-D / unified
    pub product: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservePrice {
    pub ts: DateTime<Utc>,
    /// sync, non-sync, primary, ...
    pub product: String,
    /// $/MW-h
    pub mcp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityPrice {
    pub delivery_year: i32,
    pub zone: String,
    pub price_per_mw_day: f64,
    pub product: String,
}

impl CapacityPrice {
    pub fn capacity_performance(delivery_year: i32, zone: impl Into<String>, price: f64) -> Self {
        Self {
            delivery_year,
            zone: zone.into(),
            price_per_mw_day: price,
            product: "Capacity Performance".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub zone: Option<String>,
    pub reason: Option<String>,
}
