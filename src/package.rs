//! ZIP container I/O: package bytes in, [`PartStore`] out, and back.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use docx_splice_core::content_types::CONTENT_TYPES_PART;
use docx_splice_core::{PartStore, SpliceError, DOCUMENT_PART};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxError, Result};

const PACKAGE_RELS: &str = "_rels/.rels";

/// Upper bound on the buffer reserved up front for one entry.
const MAX_PREALLOCATION: usize = 1 << 20;

/// Capacity to reserve for an entry whose header declares `declared` bytes.
/// The header is untrusted, so larger entries grow while being read.
fn preallocation(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION))
}

/// Extract every file entry of a package. Directory entries are skipped.
pub fn read_package<R: Read + Seek>(reader: R) -> Result<PartStore> {
    let mut archive = ZipArchive::new(reader)?;
    let mut parts = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut bytes = Vec::with_capacity(preallocation(file.size()));
        file.read_to_end(&mut bytes)?;
        parts.insert(name, bytes);
    }
    let store = PartStore::from_parts(parts);
    for required in [CONTENT_TYPES_PART, DOCUMENT_PART] {
        if !store.contains(required) {
            return Err(SpliceError::MissingPart(required.to_string()).into());
        }
    }
    debug!("Read package with {} parts", store.len());
    Ok(store)
}

/// Write every part, deflated. The content-type manifest and package
/// relationships go first, as Office itself writes them.
pub fn write_package<W: Write + Seek>(parts: &PartStore, writer: W) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let leading = [CONTENT_TYPES_PART, PACKAGE_RELS];
    let ordered = leading
        .iter()
        .filter_map(|name| parts.part(name).map(|bytes| (*name, bytes)))
        .chain(parts.parts().filter(|(name, _)| !leading.contains(name)));

    for (name, bytes) in ordered {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }
    Ok(zip.finish()?)
}

pub fn package_bytes(parts: &PartStore) -> Result<Vec<u8>> {
    let cursor = write_package(parts, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

/// Write the package next to `path` and rename it into place, so a failed
/// save never leaves a truncated document behind.
pub fn save_package(parts: &PartStore, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    write_package(parts, temp.as_file_mut())?;
    temp.as_file_mut().sync_all()?;
    temp.persist(path).map_err(|err| DocxError::Io(err.error))?;
    Ok(())
}

pub fn open_package(path: &Path) -> Result<PartStore> {
    read_package(File::open(path)?)
}

/// A minimal valid package produced by `docx-rs`.
pub fn blank_package() -> Result<PartStore> {
    let mut buf = Cursor::new(Vec::new());
    docx_rs::Docx::new()
        .build()
        .pack(&mut buf)
        .map_err(|err| DocxError::Template(err.to_string()))?;
    buf.set_position(0);
    read_package(buf)
}
