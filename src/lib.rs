//! Edit `.docx` packages in place.
//!
//! [`DocxEditor`] opens a package, applies feature operations (tables,
//! comments, notes, charts, tracked changes, headers, styles) by splicing
//! generated XML into the existing parts, and saves it back. Content the
//! operations do not touch is written out byte for byte.
//!
//! ```no_run
//! use docx_splice::{DocxEditor, ParagraphOptions};
//!
//! # fn main() -> docx_splice::Result<()> {
//! let mut editor = DocxEditor::open("report.docx")?;
//! editor.merge_cells_horizontal(2, 1, 1, 3)?;
//! editor.insert_paragraph(ParagraphOptions::new("Reviewed"))?;
//! editor.save("report.docx")?;
//! # Ok(())
//! # }
//! ```

pub mod editor;
pub mod error;
pub mod features;
pub mod package;
pub mod xml;

pub use docx_splice_core::{ErrorKind, InsertPosition};
pub use editor::{DocxEditor, DEFAULT_AUTHOR};
pub use error::{DocxError, Result};
pub use features::charts::{ChartKind, ChartOptions, SeriesOptions};
pub use features::comments::{Comment, CommentOptions};
pub use features::notes::{NoteKind, NoteOptions};
pub use features::page::{PageNumberFormat, PageNumberOptions};
pub use features::paragraphs::{DeleteOptions, ParagraphOptions};
pub use features::styles::{StyleDefinition, StyleType};
pub use features::tables::{CellMerge, TableOptions, TableSummary};
pub use features::toc::{TocEntry, TocOptions};
pub use features::tracked::{TrackedDeleteOptions, TrackedInsertOptions};
pub use features::watermark::WatermarkOptions;
pub use xml::{Alignment, RunFormat};
