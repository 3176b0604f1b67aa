//! Error and diagnostic types for COLLADA geometry import
//!
//! Fatal conditions are [`ImportError`] variants and abort the import of one
//! geometry element. Recoverable conditions are [`Diagnostic`]s: they are
//! logged, collected on the import report, and processing continues.

use thiserror::Error;

/// Result type for geometry import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that abort the import of a single geometry element
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    /// A numeric data block contained a token that is not a number
    #[error("malformed data in '{context}': token '{token}' is not a valid {expected}")]
    MalformedData {
        /// Element or source the token came from
        context: String,
        /// The offending token
        token: String,
        /// What the token should have been ("float", "index")
        expected: &'static str,
    },

    /// A face group has no resolvable POSITION channel
    #[error("face group '{face_group}' has no resolvable POSITION channel")]
    MissingPositionChannel {
        /// Tag (and material, if any) of the face group
        face_group: String,
    },

    /// Per-semantic index streams from one face group differ in length
    #[error("index stream length mismatch: {details}")]
    IndexStreamLengthMismatch {
        /// Which streams disagreed and their lengths
        details: String,
    },

    /// A required element or attribute is absent
    #[error("missing {what} in <{element}>")]
    MissingElement {
        /// Element being inspected
        element: String,
        /// Child element or attribute that was expected
        what: String,
    },

    /// A `#id` reference does not name an element or source
    #[error("unresolved reference '{reference}'")]
    UnresolvedReference {
        /// The reference as written in the document
        reference: String,
    },

    /// A face-corner index addresses past the end of its source
    #[error("{semantic} index {index} out of range for source '{source_id}' with {count} elements")]
    IndexOutOfRange {
        semantic: &'static str,
        source_id: String,
        index: u32,
        count: usize,
    },

    /// Normal synthesis was asked to process a stream that is not a triangle list
    #[error("index stream of length {len} is not a triangle list")]
    NotTriangleList {
        len: usize,
    },

    /// The document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),
}

impl ImportError {
    /// Create a `MissingElement` error
    pub fn missing(element: impl Into<String>, what: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
            what: what.into(),
        }
    }

    /// Create an `UnresolvedReference` error
    pub fn unresolved(reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
        }
    }
}

/// Recoverable data-quality conditions found while importing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    /// Declared element count disagrees with the parsed length; the parsed length wins
    #[error("source '{source_id}' declares {declared} values but {parsed} were parsed")]
    DataCountMismatch {
        source_id: String,
        declared: usize,
        parsed: usize,
    },
    /// An input channel names a semantic that is not imported; the channel is skipped
    #[error("semantic not supported: {semantic} (source '{source_id}')")]
    UnsupportedSemantic {
        semantic: String,
        source_id: String,
    },
    /// A polygon with fewer than three corners was dropped during triangulation
    #[error("polygon {polygon} has only {corners} corners, dropped")]
    DegeneratePolygon {
        polygon: usize,
        corners: usize,
    },
    /// A geometry element without a `mesh` child was skipped
    #[error("geometry '{geometry_id}' skipped: {reason}")]
    SkippedGeometry {
        geometry_id: String,
        reason: String,
    },
}

/// Collects diagnostics for one geometry, logging each one as it arrives
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Record a diagnostic unless an identical one is already present
    pub fn push_once(&mut self, diagnostic: Diagnostic) {
        if !self.entries.contains(&diagnostic) {
            self.push(diagnostic);
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
