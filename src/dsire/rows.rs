// src/dsire/rows.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Program identifier as delivered upstream: usually an integer, sometimes text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgramId {
    Int(i64),
    Text(String),
}

impl ProgramId {
    /// Identifier from a JSON value. Numbers and non-blank strings qualify.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => ProgramId::Int(i),
                None => ProgramId::Text(n.to_string()),
            }),
            Value::String(s) if !s.trim().is_empty() => Some(ProgramId::Text(s.clone())),
            _ => None,
        }
    }

    /// Re-type a persisted identifier; integer-looking text becomes `Int`.
    pub fn parse(s: &str) -> Self {
        s.parse::<i64>()
            .map(ProgramId::Int)
            .unwrap_or_else(|_| ProgramId::Text(s.to_string()))
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramId::Int(i) => write!(f, "{}", i),
            ProgramId::Text(s) => f.write_str(s),
        }
    }
}

/// Where a parameter row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterSource {
    /// The program's structured `ProgramParameters` list.
    #[serde(rename = "ProgramParameters")]
    Structured,
    /// Mined from the narrative incentive text.
    #[serde(rename = "DerivedFromDetails")]
    Narrative,
}

impl ParameterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterSource::Structured => "ProgramParameters",
            ParameterSource::Narrative => "DerivedFromDetails",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ProgramParameters" => Some(ParameterSource::Structured),
            "DerivedFromDetails" => Some(ParameterSource::Narrative),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flattened program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRow {
    pub program_id: ProgramId,
    pub program_code: Option<String>,
    pub program_name: Option<String>,
    pub state: Option<String>,
    pub administrator: Option<String>,
    pub implementing_sector_name: Option<String>,
    pub category_name: Option<String>,
    pub type_name: Option<String>,
    pub website_url: Option<String>,
    pub funding_source: Option<String>,
    pub budget_text: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub last_updated: Option<NaiveDate>,
    pub technologies: Option<String>,
    pub technology_categories: Option<String>,
    pub sectors: Option<String>,
    pub utilities: Option<String>,
    pub utilities_eia_ids: Option<String>,
    pub incentive_text: Option<String>,
    pub max_incentive_text: Option<String>,
    pub equipment_requirements: Option<String>,
    pub installation_requirements: Option<String>,
    pub eligibility_text: Option<String>,
    pub rec_ownership_text: Option<String>,
}

impl ProgramRow {
    /// A row carrying only its identifier.
    pub fn new(program_id: ProgramId) -> Self {
        Self {
            program_id,
            program_code: None,
            program_name: None,
            state: None,
            administrator: None,
            implementing_sector_name: None,
            category_name: None,
            type_name: None,
            website_url: None,
            funding_source: None,
            budget_text: None,
            start_date: None,
            end_date: None,
            last_updated: None,
            technologies: None,
            technology_categories: None,
            sectors: None,
            utilities: None,
            utilities_eia_ids: None,
            incentive_text: None,
            max_incentive_text: None,
            equipment_requirements: None,
            installation_requirements: None,
            eligibility_text: None,
            rec_ownership_text: None,
        }
    }
}

/// One numeric incentive value tied to a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    pub program_id: ProgramId,
    pub source: ParameterSource,
    pub tech: Option<String>,
    pub sector: Option<String>,
    /// e.g. min, max, base, cap
    pub qualifier: Option<String>,
    pub amount: f64,
    /// $/kWh, $/kW, %, USD, $/W, ...
    pub units: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn program_id_from_json() {
        assert_eq!(ProgramId::from_value(&json!(42)), Some(ProgramId::Int(42)));
        assert_eq!(
            ProgramId::from_value(&json!("NC12F")),
            Some(ProgramId::Text("NC12F".into()))
        );
        assert_eq!(ProgramId::from_value(&json!("  ")), None);
        assert_eq!(ProgramId::from_value(&Value::Null), None);
        assert_eq!(ProgramId::from_value(&json!(true)), None);
    }

    #[test]
    fn program_id_reparse() {
        assert_eq!(ProgramId::parse("17"), ProgramId::Int(17));
        assert_eq!(ProgramId::parse("CA-5"), ProgramId::Text("CA-5".into()));
        assert_eq!(ProgramId::Int(17).to_string(), "17");
    }

    #[test]
    fn source_tags() {
        for s in [ParameterSource::Structured, ParameterSource::Narrative] {
            assert_eq!(ParameterSource::parse(s.as_str()), Some(s));
        }
        assert_eq!(ParameterSource::parse("other"), None);
    }
}
