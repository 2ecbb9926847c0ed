//! CLI interface for notion-docx: command parsing, secret resolution and
//! orchestration of the export run.
//!
//! All business logic (models, the walker/renderer pipeline, filters,
//! history) lives in the `notion-docx-core` crate. This module is strictly
//! CLI glue: argument exposure, fallback tiers for required values, and
//! wiring the pipeline to the Notion client and the Google Drive uploader.
//!
//! The async entrypoint [`run`] is callable programmatically, for
//! integration tests as well as `main`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use notion_docx_core::config::SnapshotConfig;
use notion_docx_core::contract::{ContentSource, DocumentUploader};
use notion_docx_core::docx::write_docx;
use notion_docx_core::filter::FilterExpression;
use notion_docx_core::history::{load_history, remember, save_history};
use notion_docx_core::notion::NotionClient;
use notion_docx_core::snapshot::build_snapshot;

use crate::prompt;
use crate::upload::GoogleDriveClient;

/// CLI for notion-docx: snapshot Notion database pages into a Word document.
#[derive(Parser)]
#[clap(
    name = "notion-docx",
    version,
    about = "Extract rich content from Notion database pages to a Word document and publish it as a Google Doc"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export the selected database to Output/<name>_<timestamp>.docx and
    /// upload the result to Google Docs
    Export {
        /// Notion API token (falls back to NOTION_API_TOKEN, then a prompt)
        #[clap(long)]
        token: Option<String>,
        /// ID of the Notion database (falls back to history selection)
        #[clap(long)]
        database_id: Option<String>,
        /// Base name for the output document and the Google Doc
        #[clap(long)]
        document_name: Option<String>,
        /// Directory the .docx is written into
        #[clap(long, default_value = "Output")]
        output_dir: PathBuf,
        /// Filter as raw JSON, bypassing the interactive builder
        #[clap(long)]
        filter: Option<String>,
        /// Path to the filter history file
        #[clap(long, default_value = "notion_filter_history.json")]
        filter_history_file: PathBuf,
        /// Path to the database ID history file
        #[clap(long, default_value = "notion_db_history.json")]
        db_history_file: PathBuf,
        /// Google OAuth token cache file
        #[clap(long, default_value = "token.json")]
        google_token_file: PathBuf,
        /// Google OAuth installed-application client secret file
        #[clap(long, default_value = "client_secret.json")]
        google_client_secret_file: PathBuf,
        /// Skip the Google Docs upload step
        #[clap(long)]
        skip_upload: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Export {
            token,
            database_id,
            document_name,
            output_dir,
            filter,
            filter_history_file,
            db_history_file,
            google_token_file,
            google_client_secret_file,
            skip_upload,
        } => {
            export(ExportArgs {
                token,
                database_id,
                document_name,
                output_dir,
                filter,
                filter_history_file,
                db_history_file,
                google_token_file,
                google_client_secret_file,
                skip_upload,
            })
            .await
        }
    }
}

struct ExportArgs {
    token: Option<String>,
    database_id: Option<String>,
    document_name: Option<String>,
    output_dir: PathBuf,
    filter: Option<String>,
    filter_history_file: PathBuf,
    db_history_file: PathBuf,
    google_token_file: PathBuf,
    google_client_secret_file: PathBuf,
    skip_upload: bool,
}

async fn export(args: ExportArgs) -> Result<()> {
    // Required values resolve flag -> environment -> interactive prompt.
    let token = resolve_token(args.token)?;
    let source = NotionClient::new(token);

    let mut db_history: Vec<String> = load_history(&args.db_history_file);
    let database_id = match args.database_id {
        Some(id) => id,
        None => prompt::choose_database_id(&db_history)?,
    };
    if remember(&mut db_history, database_id.clone()) {
        if let Err(e) = save_history(&db_history, &args.db_history_file) {
            tracing::warn!(error = ?e, "Failed to save database ID history");
        }
    }

    let schema = source.retrieve_database(&database_id).await.map_err(|e| {
        anyhow::anyhow!(
            "Error fetching database info: {e}. Cannot proceed without database property \
             information. Please check database ID and token."
        )
    })?;
    println!("\nAvailable database properties for filtering:");
    for (name, property_type) in &schema.properties {
        println!("- {name} (Type: {})", property_type.as_str());
    }
    println!("{}", "-".repeat(40));

    let mut filter_history: Vec<FilterExpression> = load_history(&args.filter_history_file);
    let filter = match args.filter {
        Some(raw) => {
            let parsed: FilterExpression =
                serde_json::from_str(&raw).context("--filter is not valid filter JSON")?;
            parsed
                .validate(&schema)
                .map_err(|e| anyhow::anyhow!("--filter does not match the database schema: {e}"))?;
            Some(parsed)
        }
        None => prompt::choose_filter(&schema, &filter_history)?,
    };
    if let Some(chosen) = &filter {
        if remember(&mut filter_history, chosen.clone()) {
            if let Err(e) = save_history(&filter_history, &args.filter_history_file) {
                tracing::warn!(error = ?e, "Failed to save filter history");
            }
        }
    }

    let base_name = match args.document_name {
        Some(name) => name,
        None => {
            let entered = prompt::prompt_line(
                "Enter base name for the output document (e.g., 'MyNotionDoc', default: 'NotionContent'): ",
            )?;
            if entered.is_empty() {
                "NotionContent".to_string()
            } else {
                entered
            }
        }
    };
    let stamped_name = format!("{base_name}_{}", chrono::Local::now().format("%Y%m%d_%H%M"));
    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.output_dir.display()
        )
    })?;
    let output_path = args.output_dir.join(format!("{stamped_name}.docx"));

    let config = SnapshotConfig {
        database_id,
        filter,
    };
    config.trace_loaded();
    let (document, report) = build_snapshot(&source, &config).await;

    write_docx(&document, &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    println!(
        "Successfully extracted Notion content to {}",
        output_path.display()
    );
    println!(
        "Total estimated hours for processed tickets: {:.2}h",
        report.total_estimation
    );

    if args.skip_upload {
        tracing::info!("Skipping upload as requested");
        return Ok(());
    }

    println!(
        "Attempting to upload {} to Google Docs as {stamped_name}...",
        output_path.display()
    );
    let uploader = GoogleDriveClient::new(args.google_token_file, args.google_client_secret_file);
    match uploader.upload_document(&output_path, &stamped_name).await {
        Ok(uploaded) => {
            println!(
                "Google Doc created: {stamped_name} (ID: {})",
                uploaded.document_id
            );
            println!("View link: {}", uploaded.view_link);
        }
        Err(e) => {
            // The already-saved local document is never rolled back.
            tracing::error!(error = %e, "Upload failed; the local document is kept");
            println!("Upload failed: {e}");
            println!("The local document was kept at {}", output_path.display());
        }
    }

    Ok(())
}

fn resolve_token(flag: Option<String>) -> Result<String> {
    if let Some(token) = flag {
        return Ok(token);
    }
    if let Ok(token) = std::env::var("NOTION_API_TOKEN") {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    let entered = prompt::prompt_line(
        "Enter Notion API Token (or set NOTION_API_TOKEN in .env or environment variables): ",
    )?;
    if entered.is_empty() {
        bail!("Notion API Token is required. Exiting.");
    }
    Ok(entered)
}
