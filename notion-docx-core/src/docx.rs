//! Serialization of the document model to a .docx file.

use std::fs::File;
use std::path::Path;

use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, Paragraph, Pic, Run, RunFonts, Start, Style, StyleType,
};
use tracing::info;

use crate::document::{Align, DocDocument, DocElement, DocRun};

const CODE_FONT: &str = "Courier New";
const SYMBOL_FONT: &str = "Wingdings 2";
/// 10pt, in half-points as the format counts run sizes.
const FIXED_RUN_SIZE: usize = 20;
const EMU_PER_INCH: f32 = 914_400.0;
/// 0.25in of left indent per nesting level, in twips.
const LIST_INDENT_TWIPS: i32 = 360;

const BULLET_NUMBERING: usize = 2;
const DECIMAL_NUMBERING: usize = 3;

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Docx(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error writing document: {e}"),
            ExportError::Docx(e) => write!(f, "failed to serialize document: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Write the document model to `path` as a .docx file.
pub fn write_docx(document: &DocDocument, path: &Path) -> Result<(), ExportError> {
    let mut docx = scaffold();
    for element in &document.elements {
        docx = append_element(docx, element);
    }
    let file = File::create(path)?;
    docx.build()
        .pack(file)
        .map_err(|e| ExportError::Docx(e.to_string()))?;
    info!(
        path = %path.display(),
        elements = document.elements.len(),
        "Wrote document"
    );
    Ok(())
}

/// Empty document with the heading styles and list numbering definitions
/// the renderer's output refers to.
fn scaffold() -> Docx {
    Docx::new()
        .add_style(
            Style::new("Title", StyleType::Paragraph)
                .name("Title")
                .size(56)
                .bold(),
        )
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new("Heading2", StyleType::Paragraph)
                .name("Heading 2")
                .size(28)
                .bold(),
        )
        .add_style(
            Style::new("Heading3", StyleType::Paragraph)
                .name("Heading 3")
                .size(24)
                .bold(),
        )
        .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )))
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .add_abstract_numbering(AbstractNumbering::new(DECIMAL_NUMBERING).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("decimal"),
            LevelText::new("%1."),
            LevelJc::new("left"),
        )))
        .add_numbering(Numbering::new(DECIMAL_NUMBERING, DECIMAL_NUMBERING))
}

fn append_element(docx: Docx, element: &DocElement) -> Docx {
    match element {
        DocElement::Heading { level, runs } => {
            let style = match level {
                0 => "Title",
                1 => "Heading1",
                2 => "Heading2",
                _ => "Heading3",
            };
            let mut paragraph = Paragraph::new().style(style);
            for run in runs {
                paragraph = paragraph.add_run(docx_run(run));
            }
            docx.add_paragraph(paragraph)
        }
        DocElement::Paragraph { align, runs } => {
            let mut paragraph = Paragraph::new();
            if *align == Align::Center {
                paragraph = paragraph.align(AlignmentType::Center);
            }
            for run in runs {
                paragraph = paragraph.add_run(docx_run(run));
            }
            docx.add_paragraph(paragraph)
        }
        DocElement::ListItem {
            ordered,
            depth,
            runs,
        } => {
            let numbering = if *ordered {
                DECIMAL_NUMBERING
            } else {
                BULLET_NUMBERING
            };
            let mut paragraph = Paragraph::new()
                .numbering(NumberingId::new(numbering), IndentLevel::new(0))
                .indent(
                    Some(LIST_INDENT_TWIPS * *depth as i32),
                    None,
                    None,
                    None,
                );
            for run in runs {
                paragraph = paragraph.add_run(docx_run(run));
            }
            docx.add_paragraph(paragraph)
        }
        DocElement::Todo { checked, runs } => {
            let glyph = if *checked { "☑ " } else { "☐ " };
            let mut paragraph = Paragraph::new().add_run(
                Run::new()
                    .add_text(glyph)
                    .fonts(RunFonts::new().ascii(SYMBOL_FONT))
                    .size(FIXED_RUN_SIZE),
            );
            for run in runs {
                paragraph = paragraph.add_run(docx_run(run));
            }
            docx.add_paragraph(paragraph)
        }
        DocElement::Image {
            data,
            width_in,
            height_in,
            resized,
        } => {
            let mut pic = Pic::new(data);
            if *resized {
                pic = pic.size(
                    (width_in * EMU_PER_INCH) as u32,
                    (height_in * EMU_PER_INCH) as u32,
                );
            }
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)))
        }
    }
}

fn docx_run(run: &DocRun) -> Run {
    let mut r = Run::new().add_text(run.text.as_str());
    if run.style.bold {
        r = r.bold();
    }
    if run.style.italic {
        r = r.italic();
    }
    if run.style.strikethrough {
        r = r.strike();
    }
    if run.style.underline {
        r = r.underline("single");
    }
    if run.style.code {
        r = r.fonts(RunFonts::new().ascii(CODE_FONT)).size(FIXED_RUN_SIZE);
    }
    if let Some(color) = &run.color {
        r = r.color(color.as_str());
    }
    r
}
