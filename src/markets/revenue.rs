// src/markets/revenue.rs
//! Revenue arithmetic over timestamp-aligned series.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::models::EnergyInterval;

/// Values keyed by interval start.
pub type Series = BTreeMap<DateTime<Utc>, f64>;

/// Σ a·b over timestamps present (and finite) in both series.
fn aligned_product_sum(a: &Series, b: &Series) -> f64 {
    a.iter()
        .filter(|(_, v)| v.is_finite())
        .filter_map(|(ts, av)| b.get(ts).filter(|bv| bv.is_finite()).map(|bv| av * bv))
        .sum()
}

/// Energy revenue: MWh per interval (+gen, -load) × LMP $/MWh.
/// Disjoint series earn nothing.
pub fn energy_revenue_mwh(profile_mwh: &Series, price_per_mwh: &Series) -> f64 {
    aligned_product_sum(profile_mwh, price_per_mwh)
}

#[derive(Debug, Clone)]
pub struct RegulationParams {
    pub cleared_mw: Series,
    /// $/MW-h capability price
    pub rmccp: Series,
    /// $/ΔMW performance price
    pub rmpcp: Option<Series>,
    pub mileage_ratio: Option<Series>,
    /// 0..=1
    pub performance_score: f64,
    /// 1 for hourly, 0.25 for 15-minute
    pub hours_per_interval: f64,
}

impl RegulationParams {
    pub fn new(cleared_mw: Series, rmccp: Series) -> Self {
        Self {
            cleared_mw,
            rmccp,
            rmpcp: None,
            mileage_ratio: None,
            performance_score: 1.0,
            hours_per_interval: 1.0,
        }
    }
}

/// Capability revenue plus, when both mileage inputs are given, the
/// performance term. Intervals are those of `cleared_mw`; missing prices count
/// as zero.
pub fn regulation_revenue(p: &RegulationParams) -> f64 {
    let at = |s: &Series, ts: &DateTime<Utc>| s.get(ts).copied().unwrap_or(0.0);
    let capability: f64 = p
        .cleared_mw
        .iter()
        .map(|(ts, mw)| mw * at(&p.rmccp, ts) * p.hours_per_interval)
        .sum();

    let (Some(rmpcp), Some(ratio)) = (&p.rmpcp, &p.mileage_ratio) else {
        return capability;
    };
    let mileage: f64 = p
        .cleared_mw
        .iter()
        .map(|(ts, mw)| {
            mw * at(ratio, ts) * at(rmpcp, ts) * p.performance_score * p.hours_per_interval
        })
        .sum();
    capability + mileage
}

/// Reserve revenue: cleared MW × MCP $/MW-h × interval hours.
pub fn reserve_revenue(cleared_mw: &Series, mcp_per_mw_h: &Series, hours_per_interval: f64) -> f64 {
    aligned_product_sum(cleared_mw, mcp_per_mw_h) * hours_per_interval
}

/// RPM capacity revenue for one period.
pub fn capacity_revenue_ucap(ucap_mw: f64, price_per_mw_day: f64, days: f64) -> f64 {
    ucap_mw * price_per_mw_day * days
}

/// Energy delivered during emergency events, settled at real-time LMP.
pub fn emergency_energy_revenue(event_energy_mwh: &Series, rt_lmp: &Series) -> f64 {
    energy_revenue_mwh(event_energy_mwh, rt_lmp)
}

/// Per-interval result of a constant-MW energy schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledInterval {
    pub interval_start_utc: DateTime<Utc>,
    pub interval_end_utc: DateTime<Utc>,
    pub hours: f64,
    pub mwh: f64,
    pub revenue: f64,
}

/// Constant `mw` (export +, import -) over each LMP interval.
pub fn constant_mw_energy(intervals: &[EnergyInterval], mw: f64) -> Vec<ScheduledInterval> {
    intervals
        .iter()
        .map(|iv| {
            let hours = iv.hours();
            let mwh = hours * mw;
            ScheduledInterval {
                interval_start_utc: iv.interval_start_utc,
                interval_end_utc: iv.interval_end_utc,
                hours,
                mwh,
                revenue: mwh * iv.lmp,
            }
        })
        .collect()
}
