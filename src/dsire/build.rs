// src/dsire/build.rs
use anyhow::Result;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, info, instrument};

use super::{
    dates::parse_loose_date,
    extract::extract_amounts,
    labels::{DetailLabels, DetailMap, Narrative},
    raw::{load_raw_dir, RawRecord},
    rows::{ParameterRow, ParameterSource, ProgramId, ProgramRow},
    table::{ParameterTable, ProgramTable},
    text::{first_text, is_truthy, join_unique, list_items, project, value_text},
};
use crate::config::ProjectPaths;

const ID_KEYS: &[&str] = &["ProgramId", "ProgramID", "Id"];

/// Flattens raw program records into the programs and parameters tables.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    labels: DetailLabels,
}

impl TableBuilder {
    pub fn new(labels: DetailLabels) -> Self {
        Self { labels }
    }

    /// Build both tables. Records without an identifier are dropped; no
    /// per-record content can make this fail.
    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub fn build(&self, records: &[RawRecord]) -> (ProgramTable, ParameterTable) {
        let mut programs = Vec::with_capacity(records.len());
        let mut parameters = Vec::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(id) = program_id(record) else {
                skipped += 1;
                debug!("record without program id skipped");
                continue;
            };

            let narrative = self.labels.narrative(&DetailMap::from_record(record));
            structured_parameters(&id, record, &mut parameters);
            narrative_parameters(&id, narrative.incentive.as_deref(), None, &mut parameters);
            narrative_parameters(
                &id,
                narrative.max_incentive.as_deref(),
                Some("cap"),
                &mut parameters,
            );
            programs.push(program_row(id, record, narrative));
        }

        sort_programs(&mut programs);
        info!(
            programs = programs.len(),
            parameters = parameters.len(),
            skipped,
            "tables built"
        );
        (ProgramTable::new(programs), ParameterTable::new(parameters))
    }
}

/// Load the raw snapshot for `version_tag` and build both tables with the
/// default label chains.
#[instrument(level = "info", skip(paths))]
pub fn build_tables(
    version_tag: &str,
    paths: &ProjectPaths,
) -> Result<(ProgramTable, ParameterTable)> {
    let records = load_raw_dir(version_tag, paths)?;
    Ok(TableBuilder::default().build(&records))
}

fn program_id(record: &Value) -> Option<ProgramId> {
    ID_KEYS
        .iter()
        .find_map(|k| record.get(*k).and_then(ProgramId::from_value))
}

/// First non-empty candidate, then parsed; an unparseable first candidate
/// does not fall through to later ones.
fn date_field(record: &Value, keys: &[&str]) -> Option<chrono::NaiveDate> {
    keys.iter()
        .find_map(|k| record.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .and_then(parse_loose_date)
}

fn program_row(id: ProgramId, record: &Value, narrative: Narrative) -> ProgramRow {
    let eia_ids = list_items(record, "Utilities")
        .iter()
        .filter_map(|u| u.get("EIA_id"))
        .filter(|v| is_truthy(v))
        .map(value_text);

    ProgramRow {
        program_id: id,
        program_code: first_text(record, &["Code"]),
        program_name: first_text(record, &["Name"]),
        state: first_text(record, &["State"]),
        administrator: first_text(record, &["Administrator", "ImplementingSectorName"]),
        implementing_sector_name: first_text(record, &["ImplementingSectorName"]),
        category_name: first_text(record, &["CategoryName"]),
        type_name: first_text(record, &["TypeName"]),
        website_url: first_text(record, &["WebsiteUrl", "ProgramURL", "Website"]),
        funding_source: first_text(record, &["FundingSource"]),
        budget_text: first_text(record, &["Budget"]),
        start_date: date_field(record, &["StartDate", "EffectiveDate"]),
        end_date: date_field(record, &["EndDate", "ExpirationDate"]),
        last_updated: date_field(record, &["LastUpdate", "LastUpdated"]),
        technologies: join_unique(project(record, "Technologies", "name")),
        technology_categories: join_unique(project(record, "Technologies", "category")),
        sectors: join_unique(project(record, "Sectors", "name")),
        utilities: join_unique(project(record, "Utilities", "name")),
        utilities_eia_ids: join_unique(eia_ids),
        incentive_text: narrative.incentive,
        max_incentive_text: narrative.max_incentive,
        equipment_requirements: narrative.equipment_requirements,
        installation_requirements: narrative.installation_requirements,
        eligibility_text: narrative.eligibility,
        rec_ownership_text: narrative.rec_ownership,
    }
}

/// JSON numbers and numeric strings; booleans are not amounts.
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn structured_parameters(id: &ProgramId, record: &Value, out: &mut Vec<ParameterRow>) {
    for group in list_items(record, "ProgramParameters") {
        let tech = join_unique(project(group, "technologies", "name"));
        let sector = join_unique(project(group, "sectors", "name"));

        for param in list_items(group, "parameters") {
            let amount = param.get("amount").and_then(numeric);
            let units = param.get("units").and_then(value_text);
            let (Some(amount), Some(units)) = (amount, units) else {
                debug!(program_id = %id, "parameter entry without usable amount/units skipped");
                continue;
            };
            out.push(ParameterRow {
                program_id: id.clone(),
                source: ParameterSource::Structured,
                tech: tech.clone(),
                sector: sector.clone(),
                qualifier: param.get("qualifier").and_then(value_text),
                amount,
                units,
                notes: None,
            });
        }
    }
}

fn narrative_parameters(
    id: &ProgramId,
    text: Option<&str>,
    default_qualifier: Option<&str>,
    out: &mut Vec<ParameterRow>,
) {
    let Some(text) = text else { return };
    for hit in extract_amounts(text) {
        out.push(ParameterRow {
            program_id: id.clone(),
            source: ParameterSource::Narrative,
            tech: None,
            sector: None,
            qualifier: hit.qualifier.or(default_qualifier).map(str::to_string),
            amount: hit.amount,
            units: hit.units.to_string(),
            notes: Some(text.to_string()),
        });
    }
}

fn nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by (state, program_name), absent values last.
pub fn sort_programs(rows: &mut [ProgramRow]) {
    rows.sort_by(|a, b| {
        nulls_last(&a.state, &b.state).then_with(|| nulls_last(&a.program_name, &b.program_name))
    });
}
