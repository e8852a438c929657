use std::path::{Path, PathBuf};

use anyhow::Context;
use blackhole_escape::config::{self, EngineConfig};
use blackhole_escape::report;
use blackhole_escape::source::project_records_from_csv;
use blackhole_escape::{db, logging, models, Analyzer, AnalysisReport, Engine, MemorySource};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "blackhole-escape")]
#[command(about = "Deadline-aware curriculum progress and escape planning", long_about = None)]
struct Cli {
    /// Engine config (TOML); falls back to BLACKHOLE_ESCAPE_CONFIG, then built-in tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// CSV overrides for effort estimates: project_id,weeks,hours,difficulty
    #[arg(long, global = true)]
    estimates: Option<PathBuf>,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the snapshot database schema
    InitDb,
    /// Import learner snapshots from a JSON file into Postgres
    Import {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Analyze a learner and build an escape plan
    Analyze {
        #[arg(long)]
        login: String,
        /// Read records from a JSON snapshot instead of Postgres
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compute stage progress from client-supplied completions
    Progress {
        /// CSV rows: name,slug,status,final_mark
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        level: f64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Print the validated curriculum and estimate tables
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json).context("failed to initialize logging")?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import { snapshot } => {
            let pool = connect().await?;
            let source = MemorySource::from_path(&snapshot)
                .with_context(|| format!("failed to read {}", snapshot.display()))?;
            let mut imported = 0usize;
            for learner in source.snapshots() {
                db::import_snapshot(&pool, learner).await?;
                imported += 1;
            }
            println!("Imported {imported} snapshots from {}.", snapshot.display());
        }
        Commands::Analyze {
            login,
            snapshot,
            format,
            out,
        } => {
            let engine = build_engine(cli.config.as_deref(), cli.estimates.as_deref())?;
            let source = match snapshot {
                Some(path) => MemorySource::from_path(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => db::load_source(&connect().await?, &login).await?,
            };

            let analysis = match Analyzer::new(engine, source).analyze(&login) {
                Ok(analysis) => analysis,
                Err(err) if err.is_not_found() => {
                    eprintln!("Not found: {login} ({err}).");
                    std::process::exit(2);
                }
                Err(err) => return Err(err).context("analysis failed"),
            };
            let rendered = render(&analysis, format)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Progress { csv, level, format } => {
            let engine = build_engine(cli.config.as_deref(), cli.estimates.as_deref())?;
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let records = project_records_from_csv(file)?;
            let completed = models::completed_projects(&records);
            let progress = engine.stage_progress(&completed, level);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&progress)?),
                OutputFormat::Markdown => print!("{}", report::build_progress_summary(&progress)),
            }
        }
        Commands::Catalog => {
            let engine = build_engine(cli.config.as_deref(), cli.estimates.as_deref())?;
            for stage in engine.catalog().stages() {
                println!(
                    "{} {} (quorum {}): {}",
                    stage.ordinal,
                    stage.label,
                    stage.quorum,
                    stage.gating_project_ids.join(", ")
                );
            }
            println!();
            for estimate in engine.efforts().entries() {
                println!(
                    "- {}: {} weeks, {}h, {}",
                    estimate.project_id, estimate.weeks, estimate.hours, estimate.difficulty
                );
            }
            let fallback = engine.efforts().fallback();
            println!(
                "- (default): {} weeks, {}h, {}",
                fallback.weeks, fallback.hours, fallback.difficulty
            );
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to read or store learner snapshots")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn build_engine(config_path: Option<&Path>, estimates: Option<&Path>) -> anyhow::Result<Engine> {
    let mut engine_config = EngineConfig::discover(config_path)?;
    if let Some(path) = estimates {
        let overrides = config::load_estimates_csv(path)?;
        engine_config.estimates.extend(overrides);
    }
    Ok(Engine::from_config(&engine_config)?)
}

fn render(analysis: &AnalysisReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(analysis)?),
        OutputFormat::Markdown => report::build_report(analysis),
    })
}
