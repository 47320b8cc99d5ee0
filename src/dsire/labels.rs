// src/dsire/labels.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fs, path::Path};

use super::text::{list_items, strip_html};

/// Ordered label fallbacks for each narrative field pulled out of a
/// program's `Details` blocks. The first label present wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailLabels {
    pub incentive: Vec<String>,
    pub max_incentive: Vec<String>,
    pub equipment_requirements: Vec<String>,
    pub installation_requirements: Vec<String>,
    pub eligibility: Vec<String>,
    pub rec_ownership: Vec<String>,
}

fn chain(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

impl Default for DetailLabels {
    fn default() -> Self {
        Self {
            incentive: chain(&["Incentive Amount", "Incentive", "Benefit Details"]),
            max_incentive: chain(&["Maximum Incentive"]),
            equipment_requirements: chain(&["Equipment Requirements"]),
            installation_requirements: chain(&["Installation Requirements"]),
            eligibility: chain(&["Eligibility", "Eligibility Requirements"]),
            rec_ownership: chain(&["Ownership of Renewable Energy Credits"]),
        }
    }
}

impl DetailLabels {
    /// Read chains from YAML; fields left out keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let body =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&body).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Label → cleaned text for one program. Later duplicates overwrite earlier ones.
#[derive(Debug, Default, Clone)]
pub struct DetailMap(HashMap<String, String>);

impl DetailMap {
    pub fn from_record(record: &Value) -> Self {
        let mut map = HashMap::new();
        for detail in list_items(record, "Details") {
            let label = detail
                .get("label")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();
            if label.is_empty() {
                continue;
            }
            if let Some(text) = detail
                .get("value")
                .and_then(Value::as_str)
                .and_then(strip_html)
            {
                map.insert(label.to_string(), text);
            }
        }
        Self(map)
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    /// First label of `chain` with text.
    pub fn resolve(&self, chain: &[String]) -> Option<String> {
        chain.iter().find_map(|l| self.get(l)).map(str::to_string)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The six narrative fields of a program.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Narrative {
    pub incentive: Option<String>,
    pub max_incentive: Option<String>,
    pub equipment_requirements: Option<String>,
    pub installation_requirements: Option<String>,
    pub eligibility: Option<String>,
    pub rec_ownership: Option<String>,
}

impl DetailLabels {
    pub fn narrative(&self, details: &DetailMap) -> Narrative {
        Narrative {
            incentive: details.resolve(&self.incentive),
            max_incentive: details.resolve(&self.max_incentive),
            equipment_requirements: details.resolve(&self.equipment_requirements),
            installation_requirements: details.resolve(&self.installation_requirements),
            eligibility: details.resolve(&self.eligibility),
            rec_ownership: details.resolve(&self.rec_ownership),
        }
    }
}
