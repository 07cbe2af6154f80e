use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use askfiles::{
    config::Config,
    ingest::{AskResponse, ExtractionRecord, PipelineApi, PipelineService, UploadedFile},
    logging,
};
use clap::Parser;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "askfiles-extract",
    about = "Extract text from local files and optionally ask a question about them"
)]
struct Cli {
    /// Files or directories to ingest. Directories are walked recursively.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Question to answer over the extracted content.
    #[arg(long, short)]
    question: Option<String>,
    /// Print the full JSON response instead of plain text.
    #[arg(long)]
    json: bool,
    /// Log pipeline progress to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing(cli.verbose);
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;
    let service = PipelineService::from_config(&config)?;

    let files = collect_files(&cli.paths)?;
    if files.is_empty() {
        bail!("no files found under the given paths");
    }

    let response = match cli.question.as_deref() {
        Some(question) => service.ask(question, files).await?,
        None => {
            let (records, context) = service.extract(files).await;
            AskResponse {
                extracted: context.text,
                answer: None,
                files: records.iter().map(ExtractionRecord::summary).collect(),
                error: None,
            }
        }
    };

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &response)?;
        writeln!(stdout)?;
    } else {
        print_text(&mut stdout, &response)?;
    }
    Ok(())
}

fn collect_files(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
                if entry.file_type().is_file() {
                    files.push(read_upload(entry.path())?);
                }
            }
        } else {
            files.push(read_upload(path)?);
        }
    }
    Ok(files)
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let content = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(UploadedFile::new(path.display().to_string(), content))
}

fn print_text(out: &mut impl Write, response: &AskResponse) -> Result<()> {
    for file in &response.files {
        match (&file.error, &file.notice) {
            (Some(error), _) => eprintln!("warning: {}: {error}", file.name),
            (None, Some(notice)) => eprintln!("note: {}: {notice}", file.name),
            (None, None) => {}
        }
    }
    match &response.answer {
        Some(answer) => writeln!(out, "{answer}")?,
        None => writeln!(out, "{}", response.extracted)?,
    }
    Ok(())
}
