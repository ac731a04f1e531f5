use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docx_splice::{InsertPosition, PageNumberFormat};

/// Command line of the docx-splice tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "docx-splice")]
#[command(about = "Edit .docx files in place: merge cells, add comments, notes, TOC, watermarks")]
#[command(version)]
pub struct Config {
    /// Document to edit
    pub input: PathBuf,

    /// Where to write the result (defaults to overwriting INPUT)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Author recorded on comments and tracked changes
    #[arg(long, default_value = docx_splice::DEFAULT_AUTHOR, env = "DOCX_SPLICE_AUTHOR")]
    pub author: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn output(&self) -> &PathBuf {
        self.output.as_ref().unwrap_or(&self.input)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Merge cells START_COL..=END_COL of one row (all indices 1-based)
    MergeHorizontal {
        #[arg(long)]
        table: usize,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        start_col: usize,
        #[arg(long)]
        end_col: usize,
    },

    /// Merge rows START_ROW..=END_ROW of one column (all indices 1-based)
    MergeVertical {
        #[arg(long)]
        table: usize,
        #[arg(long)]
        start_row: usize,
        #[arg(long)]
        end_row: usize,
        #[arg(long)]
        col: usize,
    },

    /// Remove the Nth table
    DeleteTable {
        #[arg(long)]
        table: usize,
    },

    /// Replace the text of one cell
    UpdateCell {
        #[arg(long)]
        table: usize,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        col: usize,
        #[arg(long)]
        text: String,
    },

    /// Attach a comment to the first paragraph containing ANCHOR
    Comment {
        #[arg(long)]
        anchor: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        initials: Option<String>,
    },

    /// Add a footnote referenced from the paragraph containing ANCHOR
    Footnote {
        #[arg(long)]
        anchor: String,
        #[arg(long)]
        text: String,
    },

    /// Add an endnote referenced from the paragraph containing ANCHOR
    Endnote {
        #[arg(long)]
        anchor: String,
        #[arg(long)]
        text: String,
    },

    /// Insert a paragraph
    Paragraph {
        #[arg(long)]
        text: String,
        /// Paragraph style id, e.g. Heading1
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        bold: bool,
        #[arg(long)]
        italic: bool,
        #[arg(long)]
        underline: bool,
        /// Record the paragraph as a tracked insertion
        #[arg(long)]
        tracked: bool,
        #[command(flatten)]
        position: PositionArgs,
    },

    /// Insert a table of contents field
    Toc {
        #[arg(long, default_value = "Table of Contents")]
        title: String,
        /// Omit the heading paragraph
        #[arg(long, conflicts_with = "title")]
        no_title: bool,
        #[arg(long, default_value = "1-3")]
        levels: String,
        /// Only flag existing TOC fields for refresh
        #[arg(long)]
        refresh: bool,
    },

    /// Put a text watermark in the default header
    Watermark {
        #[arg(long, default_value = "DRAFT")]
        text: String,
        #[arg(long, default_value = "C0C0C0")]
        color: String,
        #[arg(long, default_value = "Calibri")]
        font: String,
        #[arg(long, default_value = "0.5")]
        opacity: f64,
        /// Keep the text horizontal
        #[arg(long)]
        horizontal: bool,
    },

    /// Set page numbering on the final section
    PageNumbers {
        #[arg(long)]
        start: Option<u32>,
        /// decimal, upper-roman, lower-roman, upper-letter or lower-letter
        #[arg(long, default_value = "decimal")]
        format: PageNumberFormat,
    },

    /// Mark the text of the paragraph containing ANCHOR as a tracked deletion
    TrackDelete {
        #[arg(long)]
        anchor: String,
    },

    /// Print element counts as JSON without modifying the file
    Info,
}

impl Command {
    /// Whether the command changes the document.
    pub fn writes(&self) -> bool {
        !matches!(self, Command::Info)
    }
}

/// Where a generated paragraph goes; the end of the body by default.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct PositionArgs {
    /// Insert at the start of the body
    #[arg(long)]
    pub beginning: bool,
    /// Insert after the paragraph containing this text
    #[arg(long)]
    pub after: Option<String>,
    /// Insert before the paragraph containing this text
    #[arg(long)]
    pub before: Option<String>,
}

impl PositionArgs {
    pub fn position(&self) -> InsertPosition {
        match (&self.after, &self.before) {
            (Some(anchor), _) => InsertPosition::AfterText(anchor.clone()),
            (_, Some(anchor)) => InsertPosition::BeforeText(anchor.clone()),
            _ if self.beginning => InsertPosition::Beginning,
            _ => InsertPosition::End,
        }
    }
}
