use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::Semaphore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use intake_core::config_file::{self, ConfigFile};
use intake_ingest::{ExtractionResult, FieldExtractor, IngestError, IngestOptions};

mod output;

use output::{ColorMode, FileOutcome};

/// Patient intake extractor - Pull the patient's name and date of birth out of PDF documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
struct OcrArgs {
    /// Disable the OCR fallback for image-based PDFs
    #[arg(long)]
    no_ocr: bool,

    /// Rasterization resolution for OCR [env: INTAKE_OCR_DPI]
    #[arg(long)]
    dpi: Option<u32>,

    /// Tesseract language model for OCR [env: INTAKE_OCR_LANG]
    #[arg(long)]
    lang: Option<String>,

    /// Directory containing Tesseract language data [env: TESSDATA_PREFIX]
    #[arg(long)]
    tessdata: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract patient name and date of birth from one or more PDFs
    Extract {
        /// PDF files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Give up on a file after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Maximum number of files processed at once (default: available CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        ocr: OcrArgs,
    },

    /// Print the text of every page, as the extractor sees it
    Text {
        /// PDF file to dump
        file: PathBuf,

        /// Show OCR output instead of the text layer
        #[arg(long)]
        ocr: bool,

        #[command(flatten)]
        ocr_args: OcrArgs,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the platform config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => config_file::load_from_path(path)
            .ok_or_else(|| anyhow::anyhow!("Could not read config file {}", path.display()))?,
        None => config_file::load_config(),
    };
    let color = ColorMode(!cli.no_color);

    match cli.command {
        Command::Extract {
            files,
            json,
            timeout_secs,
            jobs,
            ocr,
        } => {
            let options = resolve_options(&config, &ocr)?;
            extract(
                files,
                options,
                json,
                timeout_secs.map(Duration::from_secs),
                jobs,
                color,
            )
            .await
        }
        Command::Text {
            file,
            ocr,
            ocr_args,
        } => {
            let options = resolve_options(&config, &ocr_args)?;
            text(file, options, ocr, color).await
        }
        Command::Config { save } => show_config(&config, save),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Resolve configuration: CLI flags > env vars > config file > defaults
fn resolve_options(config: &ConfigFile, args: &OcrArgs) -> anyhow::Result<IngestOptions> {
    let mut options = IngestOptions::from_config_file(config)?;

    if args.no_ocr {
        options.ocr_enabled = false;
    }
    if let Some(dpi) = args
        .dpi
        .or_else(|| std::env::var("INTAKE_OCR_DPI").ok().and_then(|v| v.parse().ok()))
    {
        options.ocr_dpi = dpi;
    }
    if let Some(lang) = args
        .lang
        .clone()
        .or_else(|| std::env::var("INTAKE_OCR_LANG").ok())
    {
        options.ocr_language = lang;
    }
    if let Some(path) = args
        .tessdata
        .clone()
        .or_else(|| std::env::var("TESSDATA_PREFIX").ok())
    {
        options.tessdata_path = Some(path);
    }

    if options.ocr_dpi == 0 {
        anyhow::bail!("OCR resolution must be greater than zero");
    }
    Ok(options)
}

async fn extract(
    files: Vec<PathBuf>,
    options: IngestOptions,
    json: bool,
    timeout: Option<Duration>,
    jobs: Option<usize>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let extractor: Arc<FieldExtractor> = Arc::new(
        tokio::task::spawn_blocking(move || intake_ingest::build_extractor(&options)).await?,
    );
    let jobs = jobs
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(4)
        .max(1);
    let permits = Arc::new(Semaphore::new(jobs));
    tracing::info!(files = files.len(), jobs, ocr = extractor.ocr_available(), "starting extraction");

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let extractor = Arc::clone(&extractor);
            let permits = Arc::clone(&permits);
            let task_path = path.clone();
            let work = move || intake_ingest::extract_path_with(&extractor, &task_path);
            let handle = tokio::spawn(process_file(path.clone(), work, permits, timeout));
            (path, handle)
        })
        .collect();

    let gather = async {
        let mut outcomes = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => FileOutcome::Crashed(e.to_string()),
            };
            outcomes.push((path, outcome));
        }
        outcomes
    };

    let outcomes = tokio::select! {
        outcomes = gather => outcomes,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted"),
    };

    let mut stdout = std::io::stdout();
    if json {
        output::print_json(&mut stdout, &outcomes)?;
    } else {
        output::print_outcomes(&mut stdout, &outcomes, color)?;
    }

    let failed = outcomes.iter().filter(|(_, o)| !o.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, outcomes.len());
    }
    Ok(())
}

/// Run one file's extraction on the blocking pool, bounded by `permits` and
/// `timeout`.
///
/// The permit travels with the blocking work, so a timed-out extraction
/// keeps its slot until it actually finishes; only its result is discarded.
async fn process_file<F>(
    path: PathBuf,
    work: F,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
) -> FileOutcome
where
    F: FnOnce() -> Result<ExtractionResult, IngestError> + Send + 'static,
{
    let Ok(permit) = permits.acquire_owned().await else {
        return FileOutcome::Crashed("worker pool closed".into());
    };

    let work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        work()
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(path = %path.display(), secs = limit.as_secs(), "extraction timed out");
                return FileOutcome::TimedOut(limit);
            }
        },
        None => work.await,
    };

    match joined {
        Ok(result) => FileOutcome::Finished(result),
        Err(e) => FileOutcome::Crashed(e.to_string()),
    }
}

async fn text(file: PathBuf, options: IngestOptions, ocr: bool, color: ColorMode) -> anyhow::Result<()> {
    let pages = tokio::task::spawn_blocking(move || page_texts(&file, &options, ocr)).await??;
    output::print_page_texts(&mut std::io::stdout(), &pages, color)?;
    Ok(())
}

fn page_texts(file: &Path, options: &IngestOptions, ocr: bool) -> anyhow::Result<Vec<Option<String>>> {
    let bytes = intake_ingest::read_pdf(file)?;
    let extractor = intake_ingest::build_extractor(options);

    if !ocr {
        return Ok(extractor.page_texts(&bytes)?);
    }
    match extractor.ocr_page_texts(&bytes) {
        Some(texts) => Ok(texts?
            .into_iter()
            .map(|t| Some(t).filter(|t| !t.trim().is_empty()))
            .collect()),
        None if intake_ingest::ocr_compiled() => anyhow::bail!(
            "OCR is not available: Tesseract could not be initialized with language '{}'",
            options.ocr_language
        ),
        None => anyhow::bail!("OCR support not compiled in (rebuild with the `ocr` feature)"),
    }
}

fn show_config(config: &ConfigFile, save: bool) -> anyhow::Result<()> {
    if save {
        let path = config_file::save_config(config).map_err(|e| anyhow::anyhow!(e))?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    if let Some(path) = config_file::config_path() {
        println!("# platform config: {}", path.display());
    }
    println!("# OCR compiled in: {}", intake_ingest::ocr_compiled());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
