//! Conversion errors.

use std::fmt;

use thiserror::Error;

use crate::document::DocumentError;
use crate::geometry::GeometryError;

/// What kind of object a reference attribute was expected to name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    Class,
    Asset,
    Material,
    Instance,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Class => "class",
            ReferenceKind::Asset => "asset",
            ReferenceKind::Material => "material",
            ReferenceKind::Instance => "instance",
        };
        f.write_str(name)
    }
}

/// Errors raised while converting between a document and the world.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Unresolvable {kind} reference: {path}")]
    UnresolvableReference { kind: ReferenceKind, path: String },

    #[error("Structural mismatch at {prim}: expected {expected}")]
    StructuralMismatch { prim: String, expected: String },

    #[error("Component conversion without an owning actor: {prim}")]
    OwnerlessConversion { prim: String },

    #[error("No active document")]
    NoActiveDocument,

    #[error("Prim not found: {0}")]
    MissingPrim(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl ConversionError {
    pub fn unresolved(kind: ReferenceKind, path: impl Into<String>) -> Self {
        ConversionError::UnresolvableReference {
            kind,
            path: path.into(),
        }
    }

    pub fn mismatch(prim: impl Into<String>, expected: impl Into<String>) -> Self {
        ConversionError::StructuralMismatch {
            prim: prim.into(),
            expected: expected.into(),
        }
    }
}

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;
