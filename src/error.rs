//! Error types for package I/O and feature operations.

use docx_splice_core::{ErrorKind, SpliceError};

/// Errors returned by [`crate::DocxEditor`].
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("part {0} is not valid UTF-8")]
    Encoding(String),

    #[error("Failed to build blank document: {0}")]
    Template(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl DocxError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidOption(detail.into())
    }

    /// Engine classification of the failure, if it came from the engine or
    /// from argument validation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Splice(err) => Some(err.kind()),
            Self::InvalidOption(_) => Some(ErrorKind::InvalidArgument),
            Self::Xml { .. } | Self::Encoding(_) => Some(ErrorKind::Malformed),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocxError>;

/// Tag engine errors with the part they were raised against.
pub(crate) trait PartContext<T> {
    fn in_part(self, part: &str) -> Result<T>;
}

impl<T> PartContext<T> for docx_splice_core::Result<T> {
    fn in_part(self, part: &str) -> Result<T> {
        self.map_err(|err| DocxError::Splice(err.in_part(part)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_kind() {
        let err: DocxError = SpliceError::not_found("w:tbl", 4, 1).into();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert_eq!(err.to_string(), "w:tbl #4 not found (only 1 present)");
        assert_eq!(DocxError::invalid("x").kind(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn part_context_is_attached() {
        let result: docx_splice_core::Result<()> = Err(SpliceError::malformed("missing </w:body>"));
        let err = result.in_part("word/document.xml").unwrap_err();
        assert!(err.to_string().starts_with("word/document.xml: "), "{err}");
    }
}
