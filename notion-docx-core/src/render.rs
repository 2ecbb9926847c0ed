//! Maps walked blocks to document elements.
//!
//! Per-block failures (an image that cannot be downloaded or decoded) become
//! visible placeholder paragraphs; rendering always continues with the next
//! block.

use std::io::Write;

use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::contract::ContentSource;
use crate::document::{Align, DocDocument, DocElement, DocRun, RunStyle};
use crate::notion::{BlockKind, ImageSource, RichTextRun};
use crate::walker::PlacedBlock;

pub const DPI: f32 = 96.0;
pub const MAX_IMAGE_HEIGHT_IN: f32 = 2.75;
pub const MAX_IMAGE_WIDTH_IN: f32 = 6.5;

/// Append document elements for each walked block, in order.
pub async fn render_blocks<S: ContentSource + ?Sized>(
    source: &S,
    document: &mut DocDocument,
    blocks: &[PlacedBlock],
) {
    for placed in blocks {
        render_block(source, document, placed).await;
    }
}

async fn render_block<S: ContentSource + ?Sized>(
    source: &S,
    document: &mut DocDocument,
    placed: &PlacedBlock,
) {
    let depth = placed.depth;
    match &placed.block.kind {
        BlockKind::Paragraph { rich_text } => document.push(DocElement::Paragraph {
            align: Align::Left,
            runs: doc_runs(rich_text),
        }),
        BlockKind::Heading { level, rich_text } => {
            let runs = doc_runs(rich_text);
            // Levels outside 1-3 are not in the enumeration but are handled
            // as a plain paragraph.
            if (1..=3).contains(level) {
                document.push(DocElement::Heading {
                    level: *level as usize,
                    runs,
                });
            } else {
                document.push(DocElement::Paragraph {
                    align: Align::Left,
                    runs,
                });
            }
        }
        BlockKind::BulletedListItem { rich_text } => document.push(DocElement::ListItem {
            ordered: false,
            depth,
            runs: doc_runs(rich_text),
        }),
        BlockKind::NumberedListItem { rich_text } => document.push(DocElement::ListItem {
            ordered: true,
            depth,
            runs: doc_runs(rich_text),
        }),
        BlockKind::ToDo { rich_text, checked } => document.push(DocElement::Todo {
            checked: *checked,
            runs: doc_runs(rich_text),
        }),
        BlockKind::Image { source: image } => {
            render_image(source, document, &placed.block.id, image.as_ref()).await;
        }
        BlockKind::ChildPage { title } => {
            document.paragraph(format!("--- Child Page: {title} ---"));
        }
        BlockKind::Unsupported | BlockKind::Other => {
            document.paragraph(format!(
                "Unsupported block type: {}",
                placed.block.block_type
            ));
        }
    }
}

fn doc_runs(rich_text: &[RichTextRun]) -> Vec<DocRun> {
    rich_text
        .iter()
        .map(|run| DocRun::styled(run.plain_text.clone(), RunStyle::from(&run.annotations)))
        .collect()
}

async fn render_image<S: ContentSource + ?Sized>(
    source: &S,
    document: &mut DocDocument,
    block_id: &str,
    image: Option<&ImageSource>,
) {
    let Some(image) = image else {
        error!(block_id, "Image block carries neither a hosted nor an external URL");
        document.paragraph("Error processing image: no file or external URL in payload");
        return;
    };
    let url = image.url();
    match fetch_and_measure(source, url).await {
        Ok((data, width_px, height_px)) => {
            let (width_in, height_in, resized) = fit_to_bounds(width_px, height_px);
            debug!(
                block_id,
                width_px, height_px, width_in, height_in, resized, "Placing image"
            );
            document.push(DocElement::Image {
                data,
                width_in,
                height_in,
                resized,
            });
        }
        Err(ImageError::Download(e)) => {
            error!(block_id, url, error = %e, "Image download failed");
            document.paragraph(format!("Could not download image from {url}: {e}"));
        }
        Err(ImageError::Process(e)) => {
            error!(block_id, url, error = %e, "Image processing failed");
            document.paragraph(format!("Error processing image {url}: {e}"));
        }
    }
}

enum ImageError {
    Download(crate::contract::SourceError),
    Process(String),
}

/// Download the image and learn its native pixel dimensions. The bytes are
/// staged to a scoped temp file that is removed on drop, also when decoding
/// fails.
async fn fetch_and_measure<S: ContentSource + ?Sized>(
    source: &S,
    url: &str,
) -> Result<(Vec<u8>, u32, u32), ImageError> {
    let data = source.fetch_image(url).await.map_err(ImageError::Download)?;
    let mut staged = NamedTempFile::new().map_err(|e| ImageError::Process(e.to_string()))?;
    staged
        .write_all(&data)
        .and_then(|_| staged.flush())
        .map_err(|e| ImageError::Process(e.to_string()))?;
    let (width_px, height_px) =
        image::image_dimensions(staged.path()).map_err(|e| ImageError::Process(e.to_string()))?;
    Ok((data, width_px, height_px))
}

/// Physical placement size at 96 DPI, scaled down to fit the height bound
/// first and the width bound second, preserving aspect ratio. Returns
/// (width, height, resized); native size passes through untouched.
pub fn fit_to_bounds(width_px: u32, height_px: u32) -> (f32, f32, bool) {
    let native_width = width_px as f32 / DPI;
    let native_height = height_px as f32 / DPI;
    let mut width = native_width;
    let mut height = native_height;
    if height > MAX_IMAGE_HEIGHT_IN {
        let scale = MAX_IMAGE_HEIGHT_IN / height;
        height = MAX_IMAGE_HEIGHT_IN;
        width *= scale;
    }
    if width > MAX_IMAGE_WIDTH_IN {
        let scale = MAX_IMAGE_WIDTH_IN / width;
        width = MAX_IMAGE_WIDTH_IN;
        height *= scale;
    }
    (width, height, width != native_width || height != native_height)
}
