//! Positional splicing engine for WordprocessingML packages.
//!
//! The engine never builds a tree. It finds elements by scanning part bytes,
//! computes offsets, and produces new buffers, so anything it does not touch
//! is preserved exactly as written. Cross-part bookkeeping (relationships,
//! content types, id namespaces) lives here too, so feature code only has to
//! describe *what* to add.

pub mod anchor;
pub mod cells;
pub mod content_types;
pub mod error;
pub mod ids;
pub mod locator;
pub mod markup;
pub mod namespaces;
pub mod planner;
pub mod relationships;
pub mod revisions;
pub mod store;

pub use anchor::{find_paragraph_range, paragraph_text, AnchorMatch};
pub use error::{ErrorKind, Result, SpliceError};
pub use ids::{next_id, next_part_index, IdNamespace, PartSeries};
pub use locator::{blocks, count_blocks, find_nth_block, Span};
pub use planner::{insert_at, plan_insertion, replace_span, InsertPosition};
pub use relationships::{ensure_relationship, rels_path_for, Ensured, Relationship};
pub use revisions::{mark_deleted, mark_inserted, RevisionContext};
pub use store::{PartStore, Transaction};

/// Main document part of every package this engine edits.
pub const DOCUMENT_PART: &str = "word/document.xml";
