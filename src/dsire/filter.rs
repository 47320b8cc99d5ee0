// src/dsire/filter.rs
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

use super::rows::ProgramRow;
use super::table::ProgramTable;

/// Columns searched by the free-text query.
const SEARCH_COLUMNS: &[&str] = &[
    "program_name",
    "administrator",
    "website_url",
    "incentive_text",
    "max_incentive_text",
    "equipment_requirements",
    "installation_requirements",
    "eligibility_text",
    "rec_ownership_text",
];

/// Browse-view filter over the programs table. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct ProgramFilter {
    pub states: Vec<String>,
    pub type_names: Vec<String>,
    /// Any of these tokens, matched as whole words in `technologies`.
    pub technologies: Vec<String>,
    pub query: Option<String>,
}

/// A [`ProgramFilter`] with its patterns compiled.
pub struct CompiledFilter<'f> {
    filter: &'f ProgramFilter,
    tech_patterns: Vec<Regex>,
    query: Option<String>,
}

impl ProgramFilter {
    pub fn compile(&self) -> Result<CompiledFilter<'_>> {
        let tech_patterns = self
            .technologies
            .iter()
            .map(|t| {
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(t)))
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("technology token {:?}", t))
            })
            .collect::<Result<Vec<_>>>()?;
        let query = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        Ok(CompiledFilter {
            filter: self,
            tech_patterns,
            query,
        })
    }

    /// Matching rows of `table`, in table order.
    pub fn apply<'t>(&self, table: &'t ProgramTable) -> Result<Vec<&'t ProgramRow>> {
        let compiled = self.compile()?;
        Ok(table.rows().iter().filter(|r| compiled.matches(r)).collect())
    }
}

fn member(value: Option<&str>, allowed: &[String]) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

impl CompiledFilter<'_> {
    pub fn matches(&self, row: &ProgramRow) -> bool {
        if !member(row.state.as_deref(), &self.filter.states) {
            return false;
        }
        if !member(row.type_name.as_deref(), &self.filter.type_names) {
            return false;
        }
        if !self.tech_patterns.is_empty() {
            let techs = row.technologies.as_deref().unwrap_or_default();
            if !self.tech_patterns.iter().any(|re| re.is_match(techs)) {
                return false;
            }
        }
        match &self.query {
            None => true,
            Some(q) => SEARCH_COLUMNS.iter().any(|col| {
                ProgramTable::text_field(row, col).is_some_and(|v| v.to_lowercase().contains(q))
            }),
        }
    }
}

/// Sorted distinct technology tokens across the table.
pub fn technology_tokens(table: &ProgramTable) -> Vec<String> {
    table
        .rows()
        .iter()
        .filter_map(|r| r.technologies.as_deref())
        .flat_map(|s| s.split(';'))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct values of a text column (states, type names, ...).
pub fn distinct_values(table: &ProgramTable, column: &str) -> Vec<String> {
    table
        .rows()
        .iter()
        .filter_map(|r| ProgramTable::text_field(r, column))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsire::rows::ProgramId;

    fn row(id: i64, state: Option<&str>, type_name: &str, techs: Option<&str>) -> ProgramRow {
        let mut r = ProgramRow::new(ProgramId::Int(id));
        r.state = state.map(Into::into);
        r.type_name = Some(type_name.into());
        r.technologies = techs.map(Into::into);
        r.program_name = Some(format!("Program {}", id));
        r
    }

    fn table() -> ProgramTable {
        let mut solar = row(1, Some("CA"), "Rebate Program", Some("Solar PV; Wind"));
        solar.incentive_text = Some("Up to $2,500 per SYSTEM".into());
        ProgramTable::new(vec![
            solar,
            row(2, Some("AZ"), "Net Metering", Some("Solar Water Heat")),
            row(3, None, "Rebate Program", Some("Geothermal Heat Pumps; Solar PV")),
            row(4, Some("CA"), "Loan Program", None),
        ])
    }

    fn ids(rows: &[&ProgramRow]) -> Vec<String> {
        rows.iter().map(|r| r.program_id.to_string()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() -> Result<()> {
        let t = table();
        assert_eq!(ProgramFilter::default().apply(&t)?.len(), 4);
        Ok(())
    }

    #[test]
    fn state_and_type_membership() -> Result<()> {
        let t = table();
        let f = ProgramFilter {
            states: vec!["CA".into()],
            type_names: vec!["Rebate Program".into()],
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&t)?), vec!["1"]);
        Ok(())
    }

    #[test]
    fn technology_tokens_match_whole_words() -> Result<()> {
        let t = table();
        let f = ProgramFilter {
            technologies: vec!["solar pv".into()],
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&t)?), vec!["1", "3"]);

        let f = ProgramFilter {
            technologies: vec!["Solar".into(), "Wind".into()],
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&t)?), vec!["1", "2", "3"]);
        Ok(())
    }

    #[test]
    fn query_is_literal_and_case_insensitive() -> Result<()> {
        let t = table();
        let f = ProgramFilter {
            query: Some("$2,500 per system".into()),
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&t)?), vec!["1"]);
        let f = ProgramFilter {
            query: Some("program 4".into()),
            ..Default::default()
        };
        assert_eq!(ids(&f.apply(&t)?), vec!["4"]);
        Ok(())
    }

    #[test]
    fn token_and_value_lists() {
        let t = table();
        assert_eq!(
            technology_tokens(&t),
            vec!["Geothermal Heat Pumps", "Solar PV", "Solar Water Heat", "Wind"]
        );
        assert_eq!(distinct_values(&t, "state"), vec!["AZ", "CA"]);
    }
}
