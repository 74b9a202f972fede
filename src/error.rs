//! Error types for mesh loading, camera configuration and GPU setup

use std::fmt;

use thiserror::Error;

/// Section of a PLY file an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlySection {
    Header,
    Vertices,
    Faces,
}

impl fmt::Display for PlySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlySection::Header => write!(f, "header"),
            PlySection::Vertices => write!(f, "vertex block"),
            PlySection::Faces => write!(f, "face block"),
        }
    }
}

/// Main error type for plyview operations
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Wrong magic or format line
    #[error("Invalid PLY format: {0}")]
    Format(String),

    /// The stream ended before a declared section was complete
    #[error("Unexpected end of input in {section}: expected {expected} records, found {found}")]
    TruncatedInput {
        section: PlySection,
        expected: usize,
        found: usize,
    },

    /// A vertex or face record is structurally invalid
    #[error("Malformed record {record} in {section}: {reason}")]
    MalformedRecord {
        section: PlySection,
        record: usize,
        reason: String,
    },

    /// GPU buffer, pipeline or shader creation failed
    #[error("GPU resource error: {0}")]
    Resource(String),

    /// Rejected camera parameter
    #[error("Invalid camera parameter: {0}")]
    InvalidCamera(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    /// Returns true for errors raised while parsing a geometry file
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ViewerError::Format(_)
                | ViewerError::TruncatedInput { .. }
                | ViewerError::MalformedRecord { .. }
        )
    }
}

/// Result type alias for plyview operations
pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_message_names_section() {
        let err = ViewerError::TruncatedInput {
            section: PlySection::Vertices,
            expected: 2,
            found: 1,
        };
        let message = err.to_string();
        assert!(message.contains("vertex block"));
        assert!(message.contains("expected 2"));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_resource_is_not_parse_error() {
        assert!(!ViewerError::Resource("shader".into()).is_parse_error());
    }
}
