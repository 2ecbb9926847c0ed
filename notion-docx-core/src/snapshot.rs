//! High-level pipeline: orchestrates query -> walk -> render -> post-process
//! for one snapshot run.
//!
//! Each page is processed strictly sequentially. A failure while fetching
//! one page's content aborts that page only; the document built so far is
//! always returned so the caller can still save it. A failed database query
//! leaves an error note in the document instead of losing the run.

use chrono::Local;
use tracing::{error, info};

use crate::config::SnapshotConfig;
use crate::contract::ContentSource;
use crate::document::{Align, DocDocument, DocElement, DocRun, RunStyle};
use crate::estimation::extract_estimation_value;
use crate::render::render_blocks;
use crate::walker::collect_blocks;

/// Dark blue, matching the ticket subtitle line.
pub const SUBTITLE_COLOR: &str = "000080";
pub const TICKET_DIVIDER: &str = "--- END OF TICKET ---";

/// What a snapshot run produced, for logging and the CLI summary.
#[derive(Debug)]
pub struct SnapshotReport {
    pub pages: Vec<PageReport>,
    pub total_estimation: f64,
}

#[derive(Debug)]
pub struct PageReport {
    pub page_id: String,
    pub title: String,
    pub estimation: f64,
}

/// Build the snapshot document for the configured database. Never fails:
/// query or page errors degrade to visible notes in the returned document.
pub async fn build_snapshot<S: ContentSource + ?Sized>(
    source: &S,
    config: &SnapshotConfig,
) -> (DocDocument, SnapshotReport) {
    info!(database_id = %config.database_id, "Starting snapshot build");

    let mut document = DocDocument::new();
    let timestamp = Local::now().format("%d-%m-%Y %H:%M");
    document.heading(
        0,
        format!("Notion Database Content - Snapshot @ {timestamp}"),
    );

    let mut report = SnapshotReport {
        pages: Vec::new(),
        total_estimation: 0.0,
    };

    let pages = match source
        .query_database(&config.database_id, config.filter.clone())
        .await
    {
        Ok(pages) => pages,
        Err(e) => {
            error!(database_id = %config.database_id, error = %e, "Database query failed");
            document.paragraph(format!("An error occurred during extraction: {e}"));
            return (document, report);
        }
    };

    if pages.is_empty() {
        info!("No pages matched the filter");
        document.paragraph("No pages found in the database matching your filters.");
        return (document, report);
    }

    for page in &pages {
        let title = page.title();
        info!(page_id = %page.id, title = %title, "Processing ticket");

        document.heading(1, format!("Ticket: {title}"));

        let priority = page.select_name("Priority");
        let estimation_text = page.multi_select_names("Estimation");
        let estimation = extract_estimation_value(&estimation_text);
        report.total_estimation += estimation;
        document.push(DocElement::Paragraph {
            align: Align::Left,
            runs: vec![DocRun::colored(
                format!("Priority: {priority} | Estimation: {estimation_text}"),
                SUBTITLE_COLOR,
            )],
        });

        match collect_blocks(source, &page.id).await {
            Ok(blocks) => render_blocks(source, &mut document, &blocks).await,
            Err(e) => {
                error!(page_id = %page.id, error = %e, "Fetching page content failed, skipping page");
                document.paragraph(format!("An error occurred while reading this page: {e}"));
            }
        }

        document.push(DocElement::Paragraph {
            align: Align::Center,
            runs: vec![DocRun::styled(
                TICKET_DIVIDER,
                RunStyle {
                    bold: true,
                    ..Default::default()
                },
            )],
        });

        report.pages.push(PageReport {
            page_id: page.id.clone(),
            title,
            estimation,
        });
    }

    document.collapse_blank_runs();
    info!(
        pages = report.pages.len(),
        total_estimation = report.total_estimation,
        "Snapshot build complete"
    );
    (document, report)
}
