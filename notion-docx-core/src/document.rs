//! In-memory document model, assembled by the renderer and consumed by the
//! .docx writer. Keeping the model separate from serialization lets the
//! pipeline and the post-processor be tested without touching a file.

use crate::notion::Annotations;

/// Character formatting of one run. Maps 1:1 from [`Annotations`]: each flag
/// is an independent toggle with no interaction effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

impl From<&Annotations> for RunStyle {
    fn from(annotations: &Annotations) -> Self {
        RunStyle {
            bold: annotations.bold,
            italic: annotations.italic,
            strikethrough: annotations.strikethrough,
            underline: annotations.underline,
            code: annotations.code,
        }
    }
}

/// A span of text with one style, optionally colored (hex RGB, no '#').
#[derive(Debug, Clone, PartialEq)]
pub struct DocRun {
    pub text: String,
    pub style: RunStyle,
    pub color: Option<String>,
}

impl DocRun {
    pub fn plain(text: impl Into<String>) -> Self {
        DocRun {
            text: text.into(),
            style: RunStyle::default(),
            color: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        DocRun {
            text: text.into(),
            style,
            color: None,
        }
    }

    pub fn colored(text: impl Into<String>, color: impl Into<String>) -> Self {
        DocRun {
            text: text.into(),
            style: RunStyle::default(),
            color: Some(color.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// One ordered element of the output document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocElement {
    /// Level 0 is the document title; 1-3 map to heading styles.
    Heading { level: usize, runs: Vec<DocRun> },
    Paragraph { align: Align, runs: Vec<DocRun> },
    /// List paragraph, indented proportionally to `depth`.
    ListItem { ordered: bool, depth: usize, runs: Vec<DocRun> },
    /// Paragraph prefixed with a filled/empty checkbox glyph.
    Todo { checked: bool, runs: Vec<DocRun> },
    /// Raw image bytes with the physical size to place them at (inches).
    /// `resized` is false when the native size fit within bounds.
    Image { data: Vec<u8>, width_in: f32, height_in: f32, resized: bool },
}

impl DocElement {
    /// Whitespace-only text-bearing elements count as blank. To-do elements
    /// never do (the checkbox glyph is visible text); images never do.
    pub fn is_blank(&self) -> bool {
        match self {
            DocElement::Heading { runs, .. }
            | DocElement::Paragraph { runs, .. }
            | DocElement::ListItem { runs, .. } => {
                runs.iter().all(|run| run.text.trim().is_empty())
            }
            DocElement::Todo { .. } | DocElement::Image { .. } => false,
        }
    }
}

/// The accumulated output document.
#[derive(Debug, Default)]
pub struct DocDocument {
    pub elements: Vec<DocElement>,
}

impl DocDocument {
    pub fn new() -> Self {
        DocDocument::default()
    }

    pub fn push(&mut self, element: DocElement) {
        self.elements.push(element);
    }

    /// Plain single-run body paragraph.
    pub fn paragraph(&mut self, text: impl Into<String>) {
        self.push(DocElement::Paragraph {
            align: Align::Left,
            runs: vec![DocRun::plain(text)],
        });
    }

    pub fn heading(&mut self, level: usize, text: impl Into<String>) {
        self.push(DocElement::Heading {
            level,
            runs: vec![DocRun::plain(text)],
        });
    }

    /// Reduce every run of two or more consecutive blank paragraphs to
    /// exactly one. Runs on the fully assembled document, since blank runs
    /// can span page boundaries. Idempotent.
    pub fn collapse_blank_runs(&mut self) {
        let mut previous_blank = false;
        self.elements.retain(|element| {
            let blank = element.is_blank();
            let drop = blank && previous_blank;
            if !drop {
                previous_blank = blank;
            }
            !drop
        });
    }
}
