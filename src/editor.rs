//! The single-owner editing session over one open package.

use std::cell::Cell;
use std::io::{Cursor, Read, Seek};
use std::marker::PhantomData;
use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use docx_splice_core::{paragraph_text, PartStore, Transaction, DOCUMENT_PART};
use tracing::{debug, info, instrument};

use crate::error::{PartContext, Result};
use crate::package;

/// Author recorded on revisions and comments when none is configured.
pub const DEFAULT_AUTHOR: &str = "Author";

/// An open `.docx` package.
///
/// Every mutator takes `&mut self` and runs as one transaction over the
/// package parts: it either applies completely or leaves every part as it
/// was. The editor can move between threads but cannot be shared, since
/// concurrent edits of one package are not supported.
#[derive(Debug)]
pub struct DocxEditor {
    parts: PartStore,
    author: String,
    // Cell<()> is !Sync, which keeps the editor Send but not Sync.
    _single_owner: PhantomData<Cell<()>>,
}

impl DocxEditor {
    fn from_store(parts: PartStore) -> Self {
        Self {
            parts,
            author: DEFAULT_AUTHOR.to_string(),
            _single_owner: PhantomData,
        }
    }

    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let parts = package::open_package(path.as_ref())?;
        info!("Opened {} ({} parts)", path.as_ref().display(), parts.len());
        Ok(Self::from_store(parts))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        package::read_package(reader).map(Self::from_store)
    }

    /// A fresh empty document.
    pub fn new_blank() -> Result<Self> {
        let parts = package::blank_package()?;
        debug!("Created blank document with {} parts", parts.len());
        Ok(Self::from_store(parts))
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.set_author(author);
        self
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        let author = author.into();
        self.author = if author.trim().is_empty() {
            DEFAULT_AUTHOR.to_string()
        } else {
            author
        };
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Write the package to `path` through a temporary file in the same
    /// directory.
    #[instrument(level = "debug", skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        package::save_package(&self.parts, path.as_ref())?;
        info!("Saved document to {}", path.as_ref().display());
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        package::package_bytes(&self.parts)
    }

    pub fn parts(&self) -> &PartStore {
        &self.parts
    }

    /// Bytes of the main document part.
    pub fn document(&self) -> Result<&[u8]> {
        Ok(self.parts.require(DOCUMENT_PART)?)
    }

    /// Rendered text of every paragraph block, in document order.
    pub fn paragraphs(&self) -> Result<Vec<String>> {
        let document = self.document()?;
        let mut out = Vec::new();
        for block in docx_splice_core::blocks(document, "w:p") {
            let span = block.in_part(DOCUMENT_PART)?;
            out.push(paragraph_text(span.slice(document)).in_part(DOCUMENT_PART)?);
        }
        Ok(out)
    }

    /// Run `edit` as one transaction over the package parts.
    pub(crate) fn edit<T>(&mut self, edit: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        self.parts.transact(edit)
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}
