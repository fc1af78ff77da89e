use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::completion::{AVAILABLE_MODELS, describe_model};
use docqa::config::Config;
use docqa::models::{find_document, ready_documents};
use docqa::upload::{UploadStatus, format_file_size};
use docqa::{DocQaError, DocQaService, DocumentStatus, UploadFile};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Upload documents and ask questions about them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents
    List {
        /// Only documents that can be asked about
        #[arg(long)]
        ready: bool,
    },
    /// Upload plain-text files, one after another
    Upload {
        files: Vec<PathBuf>,
        /// Title for a single file (defaults to the file name without extension)
        #[arg(long)]
        title: Option<String>,
    },
    /// Ask a question about a document
    Ask {
        document_id: String,
        question: String,
        #[arg(long)]
        chunks: Option<u32>,
    },
    /// Summarize a local text file with the hosted model
    Summarize { file: PathBuf },
    /// Check the hosted model credential
    TestConnection,
    /// Show the model catalog
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    let service = DocQaService::new(&config)?;

    let outcome = match cli.command {
        Commands::List { ready } => {
            list(&service, ready).await;
            Ok(())
        }
        Commands::Upload { files, title } => upload(&service, files, title).await,
        Commands::Ask {
            document_id,
            question,
            chunks,
        } => ask(&service, &document_id, &question, chunks).await,
        Commands::Summarize { file } => summarize(&service, file).await,
        Commands::TestConnection => {
            test_connection(&service, &config).await;
            Ok(())
        }
        Commands::Models => {
            models(&config);
            Ok(())
        }
    };

    // Display-ready failures are printed as-is, without the error chain
    if let Err(e) = outcome {
        match e.downcast_ref::<DocQaError>() {
            Some(err) if err.is_user_facing() => {
                eprintln!("{}", err.to_string().red());
                std::process::exit(1);
            }
            _ => return Err(e),
        }
    }
    Ok(())
}

async fn list(service: &DocQaService, ready_only: bool) {
    let mut docs = service.client().list_documents().await;
    if ready_only {
        docs = ready_documents(&docs);
    }
    if docs.is_empty() {
        println!("No documents.");
        return;
    }
    for doc in docs {
        let status = match doc.status {
            DocumentStatus::Ready => doc.status.to_string().green(),
            DocumentStatus::Processing | DocumentStatus::Uploading => {
                doc.status.to_string().yellow()
            }
            DocumentStatus::Error => doc.status.to_string().red(),
        };
        println!(
            "{:>4}  {:<32} {:>10}  {:>3} pages  {}",
            doc.id.cyan(),
            doc.title,
            format_file_size(doc.size),
            doc.pages,
            status
        );
    }
}

async fn upload(service: &DocQaService, paths: Vec<PathBuf>, title: Option<String>) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(UploadFile::new(name, bytes));
    }

    let uploads = service.uploads();
    for rejection in uploads.add_files(files).await {
        eprintln!("{} {}", "skipped".yellow(), rejection);
    }

    if let Some(title) = title {
        let tasks = uploads.tasks().await;
        if let [only] = tasks.as_slice() {
            uploads.update_title(only.id, &title).await?;
        } else {
            eprintln!("{}", "--title ignored: it applies to exactly one file".yellow());
        }
    }

    for task in uploads.upload_all().await {
        match task.status {
            UploadStatus::Success => println!(
                "{} {} -> document {}",
                "uploaded".green(),
                task.file.name,
                task.document.map(|d| d.id).unwrap_or_default()
            ),
            _ => println!(
                "{} {}: {}",
                "failed".red(),
                task.file.name,
                task.error.unwrap_or_else(|| "Upload failed. Please try again.".to_string())
            ),
        }
    }
    if uploads.has_successful_uploads().await {
        println!("Your documents are being processed.");
    }
    Ok(())
}

async fn ask(
    service: &DocQaService,
    document_id: &str,
    question: &str,
    chunks: Option<u32>,
) -> Result<()> {
    let docs = service.client().list_documents().await;
    match find_document(&docs, document_id) {
        Some(doc) if !doc.is_ready() => eprintln!(
            "{} '{}' is still {}",
            "warning:".yellow(),
            doc.title,
            doc.status
        ),
        Some(_) => {}
        None => eprintln!(
            "{} document {} is not in the document list",
            "warning:".yellow(),
            document_id
        ),
    }

    let res = service
        .client()
        .ask_question(document_id, question, chunks)
        .await?;

    println!("{}\n", res.answer);
    println!("{} {}", "Source:".bright_cyan(), res.document_title);
    for source in &res.sources {
        println!(
            "  [{} p.{}] {}",
            source.chunk_index.to_string().cyan(),
            source.page_number,
            source.content
        );
    }
    if let Some(ai) = &res.ai_response {
        let tokens = ai
            .usage
            .map(|u| format!(", {} tokens", u.total_tokens))
            .unwrap_or_default();
        println!("{}", format!("model {}{}", ai.model, tokens).dimmed());
    }
    if let Some(ms) = res.processing_time {
        println!("{}", format!("answered in {ms} ms").dimmed());
    }
    Ok(())
}

async fn summarize(service: &DocQaService, path: PathBuf) -> Result<()> {
    let completion = service
        .completion()
        .context("TOGETHER_API_KEY is not configured")?;
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let summary = completion.generate_summary(&content, &title).await?;
    println!("{}", summary.answer);
    Ok(())
}

async fn test_connection(service: &DocQaService, config: &Config) {
    match service.completion() {
        None => println!("{} API key not configured", "failed".red()),
        Some(completion) => {
            if completion.test_connection().await {
                println!("{} {}", "connected".green(), config.completion.model);
            } else {
                println!("{} {}", "failed".red(), config.completion.model);
            }
        }
    }
}

fn models(config: &Config) {
    println!(
        "Current: {} ({})",
        config.completion.model.bright_yellow(),
        describe_model(&config.completion.model)
    );
    for m in AVAILABLE_MODELS {
        let marker = if m.id == config.completion.model { "*" } else { " " };
        println!("{} {:<46} {:<18} {}", marker, m.id, m.name, m.description);
    }
}
