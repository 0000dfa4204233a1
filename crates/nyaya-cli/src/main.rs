mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;

use nyaya_ai::{GeminiClient, LlmConfig, TokenEstimator, parse_json};
use nyaya_core::evidence::file_type_for;
use nyaya_core::{CaseRecord, EvidenceFiles, Modality};
use nyaya_pipeline::{AnalysisOutcome, Pipeline, PipelineConfig, StatusReport};
use nyaya_store::{CaseStore, DuckStore};

#[derive(Parser)]
#[command(name = "nyaya", version, about = "Evidence, summary and legal analysis for court cases")]
struct Cli {
    /// DuckDB file holding case records.
    #[arg(long, env = "NYAYA_DB", default_value = "nyaya.duckdb", global = true)]
    db: PathBuf,

    /// Print JSON instead of cards.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new case.
    Create {
        case_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },
    /// Attach an evidence file to a case.
    AddEvidence {
        case_id: String,
        path: PathBuf,
        /// Overrides the category guessed from the file extension.
        #[arg(long)]
        category: Option<String>,
    },
    /// Run evidence checking, summarization, and legal action analysis.
    Analyze {
        case_id: String,
        #[command(flatten)]
        files: FileArgs,
        /// Re-run even if the case is completed or marked processing.
        #[arg(long)]
        force: bool,
        /// Pause between throttled model calls.
        #[arg(long, default_value_t = 2)]
        throttle_secs: u64,
        #[arg(long, default_value_t = nyaya_ai::generator::DEFAULT_RETRIES)]
        retries: u32,
        /// Score each document's relevance with the model.
        #[arg(long)]
        relevance: bool,
    },
    /// Show a case's analysis progress.
    Status { case_id: String },
    /// Print a stored case record as JSON.
    Show { case_id: String },
    /// List every case.
    List,
    /// Repair and parse a saved model response.
    Parse { file: PathBuf },
}

/// Evidence files for this run. Without any, the case's stored files are used.
#[derive(Args)]
struct FileArgs {
    #[arg(long, num_args = 1..)]
    documents: Vec<PathBuf>,
    #[arg(long, num_args = 1..)]
    pdf: Vec<PathBuf>,
    #[arg(long, num_args = 1..)]
    images: Vec<PathBuf>,
    #[arg(long, num_args = 1..)]
    audio: Vec<PathBuf>,
    #[arg(long, num_args = 1..)]
    video: Vec<PathBuf>,
}

impl FileArgs {
    fn into_files(self) -> Option<EvidenceFiles> {
        let files = EvidenceFiles {
            documents: self.documents,
            pdf: self.pdf,
            images: self.images,
            audio: self.audio,
            video: self.video,
        };
        (!files.is_empty()).then_some(files)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    info!("nyaya v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Parse { file } => cmd_parse(&file),
        Command::Create {
            case_id,
            title,
            category,
            priority,
        } => {
            let store = open_store(&cli.db)?;
            let mut record = CaseRecord::new(case_id, title);
            record.category = category;
            record.priority = priority;
            let case_id = record.case_id.clone();
            store.insert(record)?;
            println!("Created case {case_id}");
            Ok(())
        }
        Command::AddEvidence {
            case_id,
            path,
            category,
        } => {
            let store = open_store(&cli.db)?;
            cmd_add_evidence(&store, &case_id, &path, category)
        }
        Command::Analyze {
            case_id,
            files,
            force,
            throttle_secs,
            retries,
            relevance,
        } => {
            let store = Arc::new(open_store(&cli.db)?);
            let config = PipelineConfig {
                throttle: Duration::from_secs(throttle_secs),
                retries,
                assess_relevance: relevance,
                ..Default::default()
            };
            cmd_analyze(store, &case_id, files.into_files(), force, config, cli.json).await
        }
        Command::Status { case_id } => {
            let store = open_store(&cli.db)?;
            let status = StatusReport::of(&store.get(&case_id)?);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                display::print_status_card(&status);
            }
            Ok(())
        }
        Command::Show { case_id } => {
            let store = open_store(&cli.db)?;
            println!("{}", serde_json::to_string_pretty(&store.get(&case_id)?)?);
            Ok(())
        }
        Command::List => {
            let store = open_store(&cli.db)?;
            let records = store.list()?;
            if cli.json {
                let rows: Vec<_> = records
                    .iter()
                    .map(|r| json!({"case_id": r.case_id, "title": r.title, "analysis_status": r.analysis_status}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                display::print_case_table(&records);
            }
            Ok(())
        }
    }
}

fn open_store(path: &Path) -> anyhow::Result<DuckStore> {
    DuckStore::open_persistent(path).with_context(|| format!("opening case store at {}", path.display()))
}

// ── Commands ──

fn cmd_add_evidence(
    store: &DuckStore,
    case_id: &str,
    path: &Path,
    category: Option<String>,
) -> anyhow::Result<()> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("evidence file {}", path.display()))?;
    let category = category.unwrap_or_else(|| file_type_for(&absolute).to_string());
    let modality = Modality::from_category(&category);
    let file_name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let record = store.add_evidence_file(
        case_id,
        json!({
            "file_name": file_name,
            "category": category,
            "absolute_path": absolute.display().to_string(),
        }),
    )?;
    println!(
        "Added {file_name} as {} evidence ({} files on case {case_id})",
        modality.input_key(),
        record.evidence_files.len()
    );
    Ok(())
}

async fn cmd_analyze(
    store: Arc<DuckStore>,
    case_id: &str,
    files: Option<EvidenceFiles>,
    force: bool,
    config: PipelineConfig,
    as_json: bool,
) -> anyhow::Result<()> {
    let llm = LlmConfig::from_env().context("loading model configuration")?;
    let estimator = TokenEstimator::from_optional_path(llm.tokenizer_path.as_deref());
    info!(model = %llm.model, exact_tokens = estimator.is_exact(), "model configured");
    let generator = Arc::new(GeminiClient::new(llm));

    let pipeline = Pipeline::new(store, generator, config).with_estimator(estimator);
    match pipeline.analyze(case_id, files, force).await? {
        AnalysisOutcome::Cached(record) => {
            let status = StatusReport::of(&record);
            if as_json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                eprintln!("Analysis already completed; pass --force to re-run.");
                display::print_status_card(&status);
            }
        }
        AnalysisOutcome::Completed(report) => {
            if as_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                display::print_report_card(&report);
            }
        }
    }
    Ok(())
}

fn cmd_parse(file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let parsed = parse_json(&String::from_utf8_lossy(&raw));
    if parsed.is_empty() {
        bail!("no JSON object could be recovered from {}", file.display());
    }
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}
