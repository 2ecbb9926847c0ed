use notion_docx_core::config::SnapshotConfig;
use notion_docx_core::contract::MockContentSource;
use notion_docx_core::document::{Align, DocElement};
use notion_docx_core::notion::{Block, BlockKind, ImageSource, Page, RichTextRun};
use notion_docx_core::snapshot::{build_snapshot, SUBTITLE_COLOR, TICKET_DIVIDER};

fn ticket_page(id: &str, title: &str, priority: &str, estimations: &[&str]) -> Page {
    Page {
        id: id.to_string(),
        properties: serde_json::json!({
            "Name": { "type": "title", "title": [ { "plain_text": title } ] },
            "Priority": { "type": "select", "select": { "name": priority } },
            "Estimation": {
                "type": "multi_select",
                "multi_select": estimations
                    .iter()
                    .map(|e| serde_json::json!({ "name": e }))
                    .collect::<Vec<_>>()
            }
        }),
    }
}

fn page_one_blocks() -> Vec<Block> {
    vec![
        Block {
            id: "h1".to_string(),
            block_type: "heading_1".to_string(),
            has_children: false,
            kind: BlockKind::Heading {
                level: 1,
                rich_text: vec![RichTextRun::plain("Summary")],
            },
        },
        Block {
            id: "todo".to_string(),
            block_type: "to_do".to_string(),
            has_children: false,
            kind: BlockKind::ToDo {
                rich_text: vec![RichTextRun::plain("write tests")],
                checked: true,
            },
        },
        Block {
            id: "img".to_string(),
            block_type: "image".to_string(),
            has_children: false,
            kind: BlockKind::Image {
                source: Some(ImageSource::Hosted {
                    url: "https://img.example/shot.png".to_string(),
                }),
            },
        },
    ]
}

fn paragraph_texts(document: &notion_docx_core::document::DocDocument) -> Vec<String> {
    document
        .elements
        .iter()
        .filter_map(|el| match el {
            DocElement::Paragraph { runs, .. } => Some(
                runs.iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join(""),
            ),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn snapshot_renders_tickets_and_survives_per_page_failures() {
    let mut source = MockContentSource::new();
    source.expect_query_database().returning(|_, _| {
        Ok(vec![
            ticket_page("page-1", "Fix login", "High", &["3.5h", "2h"]),
            ticket_page("page-2", "Broken page", "Low", &[]),
        ])
    });
    source
        .expect_list_block_children()
        .returning(|container| match container {
            "page-1" => Ok(page_one_blocks()),
            "page-2" => Err("service unavailable".into()),
            other => panic!("Unexpected container fetch: {other}"),
        });
    source
        .expect_fetch_image()
        .returning(|_| Err("404 Not Found".into()));

    let config = SnapshotConfig {
        database_id: "db-1".to_string(),
        filter: None,
    };
    let (document, report) = build_snapshot(&source, &config).await;

    // Title heading carries the snapshot timestamp.
    let DocElement::Heading { level: 0, runs } = &document.elements[0] else {
        panic!("Expected the document to start with the title heading");
    };
    assert!(runs[0].text.starts_with("Notion Database Content - Snapshot @ "));

    let headings: Vec<String> = document
        .elements
        .iter()
        .filter_map(|el| match el {
            DocElement::Heading { level: 1, runs } => Some(runs[0].text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(headings, vec!["Ticket: Fix login", "Ticket: Broken page"]);

    let paragraphs = paragraph_texts(&document);
    assert!(paragraphs
        .iter()
        .any(|t| t == "Priority: High | Estimation: 3.5h, 2h"));
    assert!(
        paragraphs
            .iter()
            .any(|t| t.starts_with("Could not download image from https://img.example/shot.png")),
        "Image failure should leave a visible placeholder: {paragraphs:?}"
    );
    assert!(
        paragraphs
            .iter()
            .any(|t| t.starts_with("An error occurred while reading this page")),
        "Page fetch failure should leave a visible note"
    );

    // The subtitle line is colored, the divider is bold and centered, and
    // both tickets end with a divider.
    let subtitle = document
        .elements
        .iter()
        .find_map(|el| match el {
            DocElement::Paragraph { runs, .. } if runs[0].text.starts_with("Priority: ") => {
                Some(&runs[0])
            }
            _ => None,
        })
        .expect("Subtitle paragraph exists");
    assert_eq!(subtitle.color.as_deref(), Some(SUBTITLE_COLOR));

    let dividers: Vec<_> = document
        .elements
        .iter()
        .filter(|el| matches!(el, DocElement::Paragraph { align: Align::Center, runs } if runs[0].text == TICKET_DIVIDER && runs[0].style.bold))
        .collect();
    assert_eq!(dividers.len(), 2, "One divider per processed ticket");

    assert_eq!(report.pages.len(), 2);
    assert!((report.total_estimation - 3.5).abs() < 1e-9);
}

#[tokio::test]
async fn empty_query_result_leaves_a_note_instead_of_tickets() {
    let mut source = MockContentSource::new();
    source.expect_query_database().returning(|_, _| Ok(vec![]));

    let config = SnapshotConfig {
        database_id: "db-1".to_string(),
        filter: None,
    };
    let (document, report) = build_snapshot(&source, &config).await;

    assert!(report.pages.is_empty());
    assert!(paragraph_texts(&document)
        .iter()
        .any(|t| t == "No pages found in the database matching your filters."));
}

#[tokio::test]
async fn failed_query_still_returns_a_saveable_document() {
    let mut source = MockContentSource::new();
    source
        .expect_query_database()
        .returning(|_, _| Err("401 Unauthorized".into()));

    let config = SnapshotConfig {
        database_id: "db-1".to_string(),
        filter: None,
    };
    let (document, report) = build_snapshot(&source, &config).await;

    assert!(report.pages.is_empty());
    assert!(paragraph_texts(&document)
        .iter()
        .any(|t| t.starts_with("An error occurred during extraction")));
}
