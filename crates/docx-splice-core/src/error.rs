use thiserror::Error;

/// Broad classification of a [`SpliceError`], used by callers that only care
/// whether to report "missing", "broken input" or "bad arguments".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Malformed,
    InvalidArgument,
}

/// Errors raised by the splicing engine.
///
/// Every variant carries enough context (element, ordinal, part) to reproduce
/// the failure from a test. Re-registering an existing relationship or
/// content-type entry is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    #[error("{element} #{requested} not found (only {available} present)")]
    NotFound {
        element: String,
        requested: usize,
        available: usize,
    },

    #[error("no paragraph contains anchor text {anchor:?}")]
    AnchorNotFound { anchor: String },

    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("part {0} is missing from the package")]
    MissingPart(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{part}: {source}")]
    InPart {
        part: String,
        #[source]
        source: Box<SpliceError>,
    },
}

impl SpliceError {
    pub fn not_found(element: impl Into<String>, requested: usize, available: usize) -> Self {
        Self::NotFound {
            element: element.into(),
            requested,
            available,
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidArgument(detail.into())
    }

    /// Attach the name of the part the error was raised against.
    pub fn in_part(self, part: impl Into<String>) -> Self {
        match self {
            // Keep the innermost part name; it is the one that was scanned.
            already @ Self::InPart { .. } => already,
            other => Self::InPart {
                part: part.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::AnchorNotFound { .. } => ErrorKind::NotFound,
            Self::Malformed(_) | Self::MissingPart(_) => ErrorKind::Malformed,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InPart { source, .. } => source.kind(),
        }
    }

    /// The error with any part context stripped.
    pub fn root(&self) -> &SpliceError {
        match self {
            Self::InPart { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpliceError>;

/// Reject zero ordinals before any scanning happens.
pub(crate) fn require_ordinal(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(SpliceError::invalid(format!("{name} must be >= 1")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_part_keeps_innermost_part_and_kind() {
        let err = SpliceError::not_found("w:tbl", 3, 2)
            .in_part("word/document.xml")
            .in_part("outer");
        match &err {
            SpliceError::InPart { part, .. } => assert_eq!(part, "word/document.xml"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.root(), &SpliceError::not_found("w:tbl", 3, 2));
    }

    #[test]
    fn display_reports_requested_and_available() {
        let err = SpliceError::not_found("w:tr", 5, 3);
        assert_eq!(err.to_string(), "w:tr #5 not found (only 3 present)");
    }
}
