//! Scene-description documents.
//!
//! A minimal stage model sufficient for the conversion walkers:
//!
//! - `Stage`: prim arena with typed attributes, time samples and layer metadata
//! - USDA reading and writing
//! - `StageCache`: shared open stages, keyed by root layer
//!
//! Composition (references, payloads, variants) is not modeled.

mod cache;
mod stage;
mod usda;
mod value;

use thiserror::Error;

pub use cache::{StageCache, StageRef};
pub use stage::{
    is_valid_identifier, make_valid_identifier, path_name, Attribute, Prim, PrimId, Specifier,
    Stage, StageMetadata,
};
pub use usda::{ParseError, ParseResult};
pub use value::{AttrValue, Quath, TimeCode};

/// Errors raised by the document layer.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid prim path: {0}")]
    InvalidPath(String),

    #[error("Layer not found in layer stack: {0}")]
    LayerNotFound(String),
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;
