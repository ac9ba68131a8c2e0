use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use batch_translator_core::{
    BatchOrchestrator, BatchOutcome, FileMetadata, HttpTransport, OrchestratorConfig,
    ProgressObserver, ProgressSnapshot, SelectionState, SseChannelProvider, StatusKind,
    UploadFile,
};
use clap::{Parser, Subcommand};
use log::warn;

/// How long the progress printer may lag behind a finished batch.
const RENDER_DRAIN: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(name = "batch-translator", version, about = "Translate uploaded diagrams in batches")]
struct Cli {
    /// YAML or JSON configuration file.
    #[arg(long, short, env = "BATCH_TRANSLATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Translation server API root, e.g. http://localhost:8080/api
    #[arg(long, env = "BATCH_TRANSLATOR_BASE_URL")]
    base_url: Option<String>,

    /// Seconds to wait for a file's completion event.
    #[arg(long, env = "BATCH_TRANSLATOR_TIMEOUT_SECS", conflicts_with = "no_timeout")]
    timeout_secs: Option<u64>,

    /// Wait for completion events without a deadline.
    #[arg(long)]
    no_timeout: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the uploaded files.
    List,
    /// Upload .asta, .astah or .svg documents.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Translate the named files (or all of them), one at a time.
    Translate {
        names: Vec<String>,
        #[arg(long, conflicts_with = "names")]
        all: bool,
    },
    /// Save the latest translation of the named files.
    Download {
        names: Vec<String>,
        #[arg(long, conflicts_with = "names")]
        all: bool,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete the named files from the server.
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<OrchestratorConfig> {
        let mut config = match &self.config {
            Some(path) => OrchestratorConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => OrchestratorConfig::default(),
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            config.terminal_event_timeout_secs = Some(timeout);
        }
        if self.no_timeout {
            config.terminal_event_timeout_secs = None;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let transport = HttpTransport::new(&config).context("building HTTP transport")?;
    let channels = SseChannelProvider::new(&config).context("building progress channel")?;
    let mut orchestrator = BatchOrchestrator::new(Arc::new(transport), Arc::new(channels), &config);

    let mut selection = SelectionState::default();
    orchestrator
        .refresh_selection(&mut selection)
        .await
        .context("fetching file list")?;

    match cli.command {
        Command::List => print_listing(selection.metadata()),
        Command::Upload { paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                let contents =
                    fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .with_context(|| format!("{} is not a file", path.display()))?;
                files.push(UploadFile::new(file_name, contents));
            }

            let report = orchestrator.upload(files, &mut selection).await?;
            print_status(&orchestrator);
            println!(
                "uploaded {}, skipped {} unsupported",
                report.uploaded.len(),
                report.unsupported.len()
            );
        }
        Command::Translate { names, all } => {
            select(&mut selection, &names, all);
            translate(&mut orchestrator, &mut selection).await?;
        }
        Command::Download { names, all, out } => {
            select(&mut selection, &names, all);
            let downloads = orchestrator.download_selected(&selection).await?;
            fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;
            for file in downloads {
                let target = out.join(&file.save_as);
                fs::write(&target, &file.contents)
                    .with_context(|| format!("writing {}", target.display()))?;
                println!("{} -> {}", file.file_name, target.display());
            }
        }
        Command::Delete { names } => {
            select(&mut selection, &names, false);
            let deleted = orchestrator.delete_selected(&mut selection).await?;
            println!("deleted {deleted} file(s)");
        }
    }

    Ok(())
}

fn select(selection: &mut SelectionState, names: &[String], all: bool) {
    if all {
        selection.select_all();
        return;
    }
    for name in names {
        if selection.lookup(name).is_none() {
            warn!("{name} is not in the server's file list");
        }
        if !selection.is_selected(name) {
            selection.toggle(name);
        }
    }
}

async fn translate(
    orchestrator: &mut BatchOrchestrator,
    selection: &mut SelectionState,
) -> Result<()> {
    let mut render = tokio::spawn(render_progress(orchestrator.observe()));
    let outcome = orchestrator.run_selection(selection).await;
    // Progress is torn down by now; let the printer flush what it saw.
    if tokio::time::timeout(RENDER_DRAIN, &mut render).await.is_err() {
        render.abort();
    }

    if outcome.is_success() {
        let total = outcome.succeeded.len();
        println!("[{total}/{total}] done");
    }
    print_status(orchestrator);
    print_summary(&outcome);

    match outcome.failure {
        Some(error) => bail!(error.user_message()),
        None => Ok(()),
    }
}

/// Prints progress lines until the batch is torn down.
async fn render_progress(mut observer: ProgressObserver) {
    let mut last = String::new();
    let mut active = false;
    while let Some(snapshot) = observer.changed().await {
        if snapshot.batch.is_none() {
            if active {
                break;
            }
            continue;
        }
        active = true;

        if let Some(line) = progress_line(&snapshot) {
            if line != last {
                println!("{line}");
                last = line;
            }
        }
    }
}

fn print_status(orchestrator: &BatchOrchestrator) {
    if let Some(status) = orchestrator.snapshot().status {
        match status.kind {
            StatusKind::Advisory => eprintln!("note: {}", status.text),
            StatusKind::Error => eprintln!("error: {}", status.text),
        }
    }
}

fn progress_line(snapshot: &ProgressSnapshot) -> Option<String> {
    let batch = snapshot.batch.as_ref()?;
    if batch.is_finished() || batch.current_file.is_empty() {
        return None;
    }

    let mut line = format!("[{}/{}] {}", batch.current + 1, batch.total, batch.current_file);
    if let Some(file) = &snapshot.file {
        line.push_str(&format!(" {:>3}% {}", file.percentage, file.message));
    }
    Some(line)
}

fn print_summary(outcome: &BatchOutcome) {
    println!(
        "translated {}, failed {}, not attempted {}, excluded {}",
        outcome.succeeded.len(),
        outcome.failed.len(),
        outcome.not_attempted.len(),
        outcome.excluded.len()
    );
    if !outcome.not_attempted.is_empty() {
        println!("not attempted: {}", outcome.not_attempted.join(", "));
    }
}

fn print_listing(listing: &[FileMetadata]) {
    if listing.is_empty() {
        println!("no files uploaded");
        return;
    }
    for entry in listing {
        let uploaded = entry
            .uploaded_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into());
        let version = entry
            .version
            .map(|version| format!("v{version}"))
            .unwrap_or_else(|| "-".into());
        let mut flags = Vec::new();
        if entry.translated {
            flags.push("translated");
        }
        if entry.outlined {
            flags.push("outlined");
        }
        println!(
            "{:<40} {:>16} {:>4} {}",
            entry.file_name,
            uploaded,
            version,
            flags.join(",")
        );
    }
}
