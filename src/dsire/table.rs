// src/dsire/table.rs

use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float64Array, StringArray},
    datatypes::{DataType, Date32Type, Field, Float64Type, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use std::sync::Arc;

use super::rows::{ParameterRow, ParameterSource, ProgramId, ProgramRow};

/// Set when `program_id` holds an integer id, so text ids such as `"123"`
/// keep their variant across a write and reload.
const ID_KIND_COLUMN: &str = "program_id_is_int";

const PROGRAM_TEXT_COLUMNS: &[&str] = &[
    "program_code",
    "program_name",
    "state",
    "administrator",
    "implementing_sector_name",
    "category_name",
    "type_name",
    "website_url",
    "funding_source",
    "budget_text",
];
const PROGRAM_DATE_COLUMNS: &[&str] = &["start_date", "end_date", "last_updated"];
const PROGRAM_TAIL_COLUMNS: &[&str] = &[
    "technologies",
    "technology_categories",
    "sectors",
    "utilities",
    "utilities_eia_ids",
    "incentive_text",
    "max_incentive_text",
    "equipment_requirements",
    "installation_requirements",
    "eligibility_text",
    "rec_ownership_text",
];

static PROGRAM_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let mut fields = vec![
        Field::new("program_id", DataType::Utf8, false),
        Field::new(ID_KIND_COLUMN, DataType::Boolean, false),
    ];
    fields.extend(
        PROGRAM_TEXT_COLUMNS
            .iter()
            .map(|n| Field::new(*n, DataType::Utf8, true)),
    );
    fields.extend(
        PROGRAM_DATE_COLUMNS
            .iter()
            .map(|n| Field::new(*n, DataType::Date32, true)),
    );
    fields.extend(
        PROGRAM_TAIL_COLUMNS
            .iter()
            .map(|n| Field::new(*n, DataType::Utf8, true)),
    );
    Arc::new(Schema::new(fields))
});

static PARAMETER_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("program_id", DataType::Utf8, false),
        Field::new(ID_KIND_COLUMN, DataType::Boolean, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("tech", DataType::Utf8, true),
        Field::new("sector", DataType::Utf8, true),
        Field::new("qualifier", DataType::Utf8, true),
        Field::new("amount", DataType::Float64, false),
        Field::new("units", DataType::Utf8, false),
        Field::new("notes", DataType::Utf8, true),
    ]))
});

// NaiveDate::default() is 1970-01-01, the Date32 epoch
fn to_days(d: Option<NaiveDate>) -> Option<i32> {
    d.map(|d| (d - NaiveDate::default()).num_days() as i32)
}

fn from_days(days: i32) -> NaiveDate {
    NaiveDate::default() + Duration::days(days as i64)
}

fn text_array<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

/// `program_id` and its kind flag.
fn id_arrays<'a>(ids: impl Iterator<Item = &'a ProgramId>) -> [ArrayRef; 2] {
    let (text, is_int): (Vec<String>, Vec<bool>) = ids
        .map(|id| (id.to_string(), matches!(id, ProgramId::Int(_))))
        .unzip();
    [
        Arc::new(StringArray::from(text)),
        Arc::new(BooleanArray::from(is_int)),
    ]
}

fn date_array(values: impl Iterator<Item = Option<NaiveDate>>) -> ArrayRef {
    Arc::new(values.map(to_days).collect::<Date32Array>())
}

/// Typed column lookup on a batch whose schema is already trusted.
struct Columns<'a>(&'a RecordBatch);

impl<'a> Columns<'a> {
    fn column(&self, name: &str) -> Result<&'a ArrayRef> {
        self.0
            .column_by_name(name)
            .ok_or_else(|| anyhow!("missing column `{}`", name))
    }

    fn text(&self, name: &str) -> Result<&'a StringArray> {
        self.column(name)?
            .as_string_opt::<i32>()
            .ok_or_else(|| anyhow!("column `{}` is not Utf8", name))
    }

    fn date(&self, name: &str) -> Result<&'a Date32Array> {
        self.column(name)?
            .as_primitive_opt::<Date32Type>()
            .ok_or_else(|| anyhow!("column `{}` is not Date32", name))
    }

    fn boolean(&self, name: &str) -> Result<&'a BooleanArray> {
        self.column(name)?
            .as_boolean_opt()
            .ok_or_else(|| anyhow!("column `{}` is not Boolean", name))
    }

    fn float(&self, name: &str) -> Result<&'a Float64Array> {
        self.column(name)?
            .as_primitive_opt::<Float64Type>()
            .ok_or_else(|| anyhow!("column `{}` is not Float64", name))
    }
}

fn opt_text(arr: &StringArray, i: usize) -> Option<String> {
    arr.is_valid(i).then(|| arr.value(i).to_string())
}

fn opt_date(arr: &Date32Array, i: usize) -> Option<NaiveDate> {
    arr.is_valid(i).then(|| from_days(arr.value(i)))
}

fn req_id(ids: &StringArray, is_int: &BooleanArray, i: usize) -> Result<ProgramId> {
    let text = req_text(ids, i, "program_id")?;
    if is_int.is_null(i) {
        return Err(anyhow!("null in required column `{}` at row {}", ID_KIND_COLUMN, i));
    }
    if !is_int.value(i) {
        return Ok(ProgramId::Text(text));
    }
    text.parse::<i64>()
        .map(ProgramId::Int)
        .with_context(|| format!("integer program_id `{}` at row {}", text, i))
}

fn req_text(arr: &StringArray, i: usize, name: &str) -> Result<String> {
    opt_text(arr, i).ok_or_else(|| anyhow!("null in required column `{}` at row {}", name, i))
}

/// The programs table: one row per program, sorted by (state, program_name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramTable {
    rows: Vec<ProgramRow>,
}

impl ProgramTable {
    pub fn new(rows: Vec<ProgramRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ProgramRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ProgramRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &ProgramId) -> Option<&ProgramRow> {
        self.rows.iter().find(|r| &r.program_id == id)
    }

    pub fn schema() -> SchemaRef {
        PROGRAM_SCHEMA.clone()
    }

    /// Text value of a Utf8 program column by name.
    pub(crate) fn text_field<'a>(row: &'a ProgramRow, name: &str) -> Option<&'a str> {
        match name {
            "program_code" => row.program_code.as_deref(),
            "program_name" => row.program_name.as_deref(),
            "state" => row.state.as_deref(),
            "administrator" => row.administrator.as_deref(),
            "implementing_sector_name" => row.implementing_sector_name.as_deref(),
            "category_name" => row.category_name.as_deref(),
            "type_name" => row.type_name.as_deref(),
            "website_url" => row.website_url.as_deref(),
            "funding_source" => row.funding_source.as_deref(),
            "budget_text" => row.budget_text.as_deref(),
            "technologies" => row.technologies.as_deref(),
            "technology_categories" => row.technology_categories.as_deref(),
            "sectors" => row.sectors.as_deref(),
            "utilities" => row.utilities.as_deref(),
            "utilities_eia_ids" => row.utilities_eia_ids.as_deref(),
            "incentive_text" => row.incentive_text.as_deref(),
            "max_incentive_text" => row.max_incentive_text.as_deref(),
            "equipment_requirements" => row.equipment_requirements.as_deref(),
            "installation_requirements" => row.installation_requirements.as_deref(),
            "eligibility_text" => row.eligibility_text.as_deref(),
            "rec_ownership_text" => row.rec_ownership_text.as_deref(),
            _ => None,
        }
    }

    fn date_field(row: &ProgramRow, name: &str) -> Option<NaiveDate> {
        match name {
            "start_date" => row.start_date,
            "end_date" => row.end_date,
            "last_updated" => row.last_updated,
            _ => None,
        }
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut cols: Vec<ArrayRef> = id_arrays(self.rows.iter().map(|r| &r.program_id)).into();
        for name in PROGRAM_TEXT_COLUMNS {
            cols.push(text_array(self.rows.iter().map(|r| Self::text_field(r, name))));
        }
        for name in PROGRAM_DATE_COLUMNS {
            cols.push(date_array(self.rows.iter().map(|r| Self::date_field(r, name))));
        }
        for name in PROGRAM_TAIL_COLUMNS {
            cols.push(text_array(self.rows.iter().map(|r| Self::text_field(r, name))));
        }
        RecordBatch::try_new(Self::schema(), cols).context("building programs record batch")
    }

    /// Append the rows of `batch`, which must carry the programs schema.
    pub fn extend_from_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let c = Columns(batch);
        let (ids, is_int) = (c.text("program_id")?, c.boolean(ID_KIND_COLUMN)?);
        let t = |n: &str| c.text(n);
        let d = |n: &str| c.date(n);
        let (code, name, state, admin, impl_sector, category, type_name) = (
            t("program_code")?,
            t("program_name")?,
            t("state")?,
            t("administrator")?,
            t("implementing_sector_name")?,
            t("category_name")?,
            t("type_name")?,
        );
        let (url, funding, budget) = (t("website_url")?, t("funding_source")?, t("budget_text")?);
        let (start, end, updated) = (d("start_date")?, d("end_date")?, d("last_updated")?);
        let (techs, tech_cats, sectors, utilities, eia) = (
            t("technologies")?,
            t("technology_categories")?,
            t("sectors")?,
            t("utilities")?,
            t("utilities_eia_ids")?,
        );
        let (incentive, max_incentive, equipment, installation, eligibility, rec) = (
            t("incentive_text")?,
            t("max_incentive_text")?,
            t("equipment_requirements")?,
            t("installation_requirements")?,
            t("eligibility_text")?,
            t("rec_ownership_text")?,
        );

        self.rows.reserve(batch.num_rows());
        for i in 0..batch.num_rows() {
            self.rows.push(ProgramRow {
                program_id: req_id(ids, is_int, i)?,
                program_code: opt_text(code, i),
                program_name: opt_text(name, i),
                state: opt_text(state, i),
                administrator: opt_text(admin, i),
                implementing_sector_name: opt_text(impl_sector, i),
                category_name: opt_text(category, i),
                type_name: opt_text(type_name, i),
                website_url: opt_text(url, i),
                funding_source: opt_text(funding, i),
                budget_text: opt_text(budget, i),
                start_date: opt_date(start, i),
                end_date: opt_date(end, i),
                last_updated: opt_date(updated, i),
                technologies: opt_text(techs, i),
                technology_categories: opt_text(tech_cats, i),
                sectors: opt_text(sectors, i),
                utilities: opt_text(utilities, i),
                utilities_eia_ids: opt_text(eia, i),
                incentive_text: opt_text(incentive, i),
                max_incentive_text: opt_text(max_incentive, i),
                equipment_requirements: opt_text(equipment, i),
                installation_requirements: opt_text(installation, i),
                eligibility_text: opt_text(eligibility, i),
                rec_ownership_text: opt_text(rec, i),
            });
        }
        Ok(())
    }

    pub fn from_batches<'a>(batches: impl IntoIterator<Item = &'a RecordBatch>) -> Result<Self> {
        let mut table = Self::default();
        for batch in batches {
            table.extend_from_batch(batch)?;
        }
        Ok(table)
    }
}

/// The parameters table, in encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    rows: Vec<ParameterRow>,
}

impl ParameterTable {
    pub fn new(rows: Vec<ParameterRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ParameterRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parameter rows belonging to one program.
    pub fn for_program<'a>(&'a self, id: &'a ProgramId) -> impl Iterator<Item = &'a ParameterRow> {
        self.rows.iter().filter(move |p| &p.program_id == id)
    }

    pub fn schema() -> SchemaRef {
        PARAMETER_SCHEMA.clone()
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let rows = &self.rows;
        let [ids, is_int] = id_arrays(rows.iter().map(|r| &r.program_id));
        let cols: Vec<ArrayRef> = vec![
            ids,
            is_int,
            text_array(rows.iter().map(|r| Some(r.source.as_str()))),
            text_array(rows.iter().map(|r| r.tech.as_deref())),
            text_array(rows.iter().map(|r| r.sector.as_deref())),
            text_array(rows.iter().map(|r| r.qualifier.as_deref())),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.amount))),
            text_array(rows.iter().map(|r| Some(r.units.as_str()))),
            text_array(rows.iter().map(|r| r.notes.as_deref())),
        ];
        RecordBatch::try_new(Self::schema(), cols).context("building parameters record batch")
    }

    /// Append the rows of `batch`, which must carry the parameters schema.
    pub fn extend_from_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let c = Columns(batch);
        let (ids, is_int) = (c.text("program_id")?, c.boolean(ID_KIND_COLUMN)?);
        let (source, tech, sector, qualifier, amount, units, notes) = (
            c.text("source")?,
            c.text("tech")?,
            c.text("sector")?,
            c.text("qualifier")?,
            c.float("amount")?,
            c.text("units")?,
            c.text("notes")?,
        );

        self.rows.reserve(batch.num_rows());
        for i in 0..batch.num_rows() {
            let tag = req_text(source, i, "source")?;
            let source = ParameterSource::parse(&tag)
                .ok_or_else(|| anyhow!("unknown parameter source `{}` at row {}", tag, i))?;
            if amount.is_null(i) {
                return Err(anyhow!("null in required column `amount` at row {}", i));
            }
            self.rows.push(ParameterRow {
                program_id: req_id(ids, is_int, i)?,
                source,
                tech: opt_text(tech, i),
                sector: opt_text(sector, i),
                qualifier: opt_text(qualifier, i),
                amount: amount.value(i),
                units: req_text(units, i, "units")?,
                notes: opt_text(notes, i),
            });
        }
        Ok(())
    }

    pub fn from_batches<'a>(batches: impl IntoIterator<Item = &'a RecordBatch>) -> Result<Self> {
        let mut table = Self::default();
        for batch in batches {
            table.extend_from_batch(batch)?;
        }
        Ok(table)
    }
}

/// Percentage of nulls per column, one decimal, most incomplete first.
pub fn null_percent(batch: &RecordBatch) -> Vec<(String, f64)> {
    let rows = batch.num_rows();
    let mut out: Vec<(String, f64)> = batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| {
            let pct = if rows == 0 {
                0.0
            } else {
                (col.null_count() as f64 / rows as f64 * 1000.0).round() / 10.0
            };
            (field.name().clone(), pct)
        })
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(id: ProgramId) -> ProgramRow {
        let mut row = ProgramRow::new(id);
        row.program_name = Some("Net Metering".into());
        row.state = Some("NJ".into());
        row.start_date = NaiveDate::from_ymd_opt(2021, 3, 3);
        row.last_updated = NaiveDate::from_ymd_opt(1969, 12, 31);
        row.technologies = Some("Solar PV; Wind".into());
        row.incentive_text = Some("Up to\n50% & more".into());
        row
    }

    #[test]
    fn program_batch_round_trip() -> Result<()> {
        let table = ProgramTable::new(vec![
            program(ProgramId::Int(5)),
            ProgramRow::new(ProgramId::Text("NJ-x".into())),
        ]);
        let batch = table.to_record_batch()?;
        assert_eq!(batch.num_columns(), 26);
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), ProgramTable::schema());

        let back = ProgramTable::from_batches([&batch])?;
        assert_eq!(back, table);
        Ok(())
    }

    #[test]
    fn numeric_text_ids_keep_their_variant() -> Result<()> {
        let text_id = ProgramId::Text("123".into());
        let programs = ProgramTable::new(vec![
            ProgramRow::new(text_id.clone()),
            ProgramRow::new(ProgramId::Int(123)),
            ProgramRow::new(ProgramId::Int(-7)),
        ]);
        let back = ProgramTable::from_batches([&programs.to_record_batch()?])?;
        assert_eq!(back, programs);
        assert_eq!(back.get(&text_id).map(|r| &r.program_id), Some(&text_id));

        let params = ParameterTable::new(vec![ParameterRow {
            program_id: text_id.clone(),
            source: ParameterSource::Structured,
            tech: None,
            sector: None,
            qualifier: None,
            amount: 1.0,
            units: "USD".into(),
            notes: None,
        }]);
        let back = ParameterTable::from_batches([&params.to_record_batch()?])?;
        assert_eq!(back.for_program(&text_id).count(), 1);
        Ok(())
    }

    #[test]
    fn parameter_batch_round_trip() -> Result<()> {
        let id = ProgramId::Int(5);
        let table = ParameterTable::new(vec![
            ParameterRow {
                program_id: id.clone(),
                source: ParameterSource::Structured,
                tech: Some("Solar PV".into()),
                sector: None,
                qualifier: Some("max".into()),
                amount: 0.25,
                units: "$/W".into(),
                notes: None,
            },
            ParameterRow {
                program_id: ProgramId::Int(6),
                source: ParameterSource::Narrative,
                tech: None,
                sector: None,
                qualifier: Some("cap".into()),
                amount: 2500.0,
                units: "USD".into(),
                notes: Some("up to $2,500".into()),
            },
        ]);
        let batch = table.to_record_batch()?;
        let back = ParameterTable::from_batches([&batch])?;
        assert_eq!(back, table);
        assert_eq!(back.for_program(&id).count(), 1);
        Ok(())
    }

    #[test]
    fn rejects_foreign_batches() -> Result<()> {
        let batch = RecordBatch::try_new(
            Arc::new(Schema::new(vec![Field::new("x", DataType::Utf8, true)])),
            vec![text_array([Some("a")].into_iter())],
        )?;
        assert!(ProgramTable::from_batches([&batch]).is_err());
        assert!(ParameterTable::from_batches([&batch]).is_err());
        Ok(())
    }

    #[test]
    fn completeness_view() -> Result<()> {
        let table = ProgramTable::new(vec![
            program(ProgramId::Int(1)),
            ProgramRow::new(ProgramId::Int(2)),
            ProgramRow::new(ProgramId::Int(3)),
        ]);
        let pct = null_percent(&table.to_record_batch()?);
        assert_eq!(pct.len(), 26);
        assert_eq!(pct[0].1, 100.0);
        let state = pct.iter().find(|(n, _)| n == "state").unwrap();
        assert_eq!(state.1, 66.7);
        let complete: Vec<_> = pct.iter().filter(|(_, p)| *p == 0.0).map(|(n, _)| n.as_str()).collect();
        assert_eq!(complete, vec!["program_id", ID_KIND_COLUMN]);
        Ok(())
    }
}
