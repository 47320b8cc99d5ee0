use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dervalue::{
    config::{DsireClientConfig, GridStatusConfig, ProjectPaths},
    dsire::{
        self,
        filter::{distinct_values, technology_tokens, ProgramFilter},
        store::export_programs_csv,
        table::null_percent,
        DetailLabels, OutputFormat, ProgramId, ProgramTable, TableBuilder,
    },
    fetch::{dates::parse_yyyymmdd, update_dsire, DsireClient, UpdateOptions},
    markets::{revenue::constant_mw_energy, GridStatusClient},
};
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_VERSION: &str = "VSDB_2025_08_w1";

#[derive(Parser)]
#[command(author, version, about = "DER value stack: DSIRE incentives and PJM prices")]
struct Cli {
    /// Project root holding `data/`
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull DSIRE programs month by month into the raw snapshot directory
    Fetch {
        #[arg(long, default_value = DEFAULT_VERSION)]
        version_tag: String,
        /// YYYYMMDD; defaults to the saved checkpoint
        #[arg(long, value_parser = parse_yyyymmdd)]
        start: Option<NaiveDate>,
        /// YYYYMMDD; defaults to today
        #[arg(long, value_parser = parse_yyyymmdd)]
        end: Option<NaiveDate>,
        #[arg(long, default_value_t = 0.0)]
        sleep_sec: f64,
    },
    /// Build and persist the programs and parameters tables
    Build {
        #[arg(long, default_value = DEFAULT_VERSION)]
        version_tag: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Parquet)]
        format: OutputFormat,
        /// YAML file overriding the detail label chains
        #[arg(long)]
        labels: Option<PathBuf>,
    },
    /// List raw snapshot versions on disk
    Versions,
    /// Filter and inspect programs
    Browse {
        #[arg(long, default_value = DEFAULT_VERSION)]
        version_tag: String,
        #[arg(long = "state")]
        states: Vec<String>,
        #[arg(long = "type")]
        type_names: Vec<String>,
        #[arg(long = "tech")]
        technologies: Vec<String>,
        #[arg(long)]
        query: Option<String>,
        /// Show one program with its parameters
        #[arg(long)]
        program: Option<String>,
        /// Export the filtered programs
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Null percentage per programs column
        #[arg(long)]
        completeness: bool,
        /// List technology tokens and exit
        #[arg(long)]
        list_techs: bool,
        /// List distinct values of a text column (state, type_name, ...) and exit
        #[arg(long)]
        list_values: Option<String>,
    },
    /// Day-ahead energy value of a constant MW schedule at one PJM node
    PjmEnergy {
        #[arg(long, env = "GRIDSTATUS_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, default_value = "PJM-RTO")]
        location: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        /// Export (+) or import (-) MW
        #[arg(long, default_value_t = 1.0)]
        mw: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();
    let paths = ProjectPaths::new(&cli.root);

    match cli.command {
        Command::Fetch {
            version_tag,
            start,
            end,
            sleep_sec,
        } => {
            if !(sleep_sec.is_finite() && sleep_sec >= 0.0) {
                bail!("--sleep-sec must be a non-negative number");
            }
            let client = DsireClient::new(DsireClientConfig::default())?;
            let opts = UpdateOptions {
                version_tag,
                start,
                end,
                pause: Duration::from_secs_f64(sleep_sec),
            };
            let written = update_dsire(&client, &paths, &opts).await?;
            info!(files = written.len(), "fetch complete");
        }
        Command::Build {
            version_tag,
            format,
            labels,
        } => {
            let builder = match labels {
                Some(path) => TableBuilder::new(DetailLabels::from_yaml_file(path)?),
                None => TableBuilder::default(),
            };
            let records = dsire::load_raw_dir(&version_tag, &paths)?;
            let (programs, parameters) = builder.build(&records);
            let (p1, p2) = dsire::write_tables(&programs, &parameters, &paths, &version_tag, format)?;
            println!("{}\n{}", p1.display(), p2.display());
        }
        Command::Versions => {
            for v in dsire::list_versions(&paths)? {
                println!("{}", v);
            }
        }
        Command::Browse {
            version_tag,
            states,
            type_names,
            technologies,
            query,
            program,
            csv,
            completeness,
            list_techs,
            list_values,
        } => {
            let (programs, parameters) = dsire::load_or_build(&version_tag, &paths)?;

            if list_techs {
                for t in technology_tokens(&programs) {
                    println!("{}", t);
                }
                return Ok(());
            }
            if let Some(column) = list_values {
                for v in distinct_values(&programs, &column) {
                    println!("{}", v);
                }
                return Ok(());
            }

            if let Some(id) = program {
                // match on the rendered id so "123" finds both Int and Text ids
                let id = id.trim();
                let row = programs
                    .get(&ProgramId::parse(id))
                    .or_else(|| programs.rows().iter().find(|r| r.program_id.to_string() == id));
                let Some(row) = row else {
                    bail!("program {} not found in {}", id, version_tag);
                };
                println!("{}", serde_json::to_string_pretty(row)?);
                for p in parameters.for_program(&row.program_id) {
                    println!("{}", serde_json::to_string(p)?);
                }
                return Ok(());
            }

            let filter = ProgramFilter {
                states,
                type_names,
                technologies,
                query,
            };
            let matched: Vec<_> = filter.apply(&programs)?.into_iter().cloned().collect();
            let matched = ProgramTable::new(matched);
            for row in matched.rows() {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.program_id,
                    row.state.as_deref().unwrap_or(""),
                    row.type_name.as_deref().unwrap_or(""),
                    row.program_name.as_deref().unwrap_or("")
                );
            }
            info!(matched = matched.len(), total = programs.len(), "filtered");

            if completeness {
                for (column, pct) in null_percent(&matched.to_record_batch()?) {
                    println!("{:<28} {:>5.1}%", column, pct);
                }
            }
            if let Some(out) = csv {
                export_programs_csv(&matched, &out)?;
                info!(path = %out.display(), "exported");
            }
        }
        Command::PjmEnergy {
            api_key,
            location,
            start,
            end,
            mw,
        } => {
            if end < start {
                bail!("--end {} is before --start {}", end, start);
            }
            let client = GridStatusClient::new(GridStatusConfig::new(api_key))?;
            let lmps = client.lmp_hourly("DA", start, end, &location).await?;
            let schedule = constant_mw_energy(&lmps, mw);
            let mwh: f64 = schedule.iter().map(|s| s.mwh).sum();
            let revenue: f64 = schedule.iter().map(|s| s.revenue).sum();
            println!(
                "{} {}..{}: {} intervals, {:.1} MWh, ${:.2}",
                location,
                start,
                end,
                schedule.len(),
                mwh,
                revenue
            );
        }
    }
    Ok(())
}
