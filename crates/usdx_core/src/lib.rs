//! USDX Core - Scene-description ⇄ runtime scene graph conversion.
//!
//! This crate provides:
//!
//! - **Documents**: an in-memory stage with USDA reading and writing
//! - **World**: actors, attached components, folders and foliage
//! - **Classification**: attribute tags that say how a prim converts
//! - **Import / export walkers** and the geometry codecs they use
//! - **ConversionContext**: one open stage plus single-node conversions
//!
//! # Example
//!
//! ```ignore
//! use usdx_core::{import_stage, Registry, Stage, World};
//!
//! let stage = Stage::open("level.usda")?;
//! let mut world = World::new("Level");
//! let report = import_stage(&stage, &mut world, &Registry::default());
//! println!("Spawned {} actors", report.spawned_actors.len());
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod export;
pub mod exporter;
pub mod geometry;
pub mod import;
pub mod name_index;
pub mod registry;
pub mod schema;
pub mod world;
pub mod xform;

// Re-export commonly used types
pub use classify::{classify, ConversionMethod, NodeKind, PrimInfo, Usage};
pub use config::{ConversionSettings, StageOptions};
pub use context::ConversionContext;
pub use document::{AttrValue, PrimId, Stage, StageCache, TimeCode};
pub use error::{ConversionError, ConversionResult, ReferenceKind};
pub use exporter::{export_world, ExportReport, LevelExporter};
pub use import::{import_stage, ImportReport, ImportSession, NodeFailure};
pub use name_index::NameIndex;
pub use registry::{ActorClass, AssetRegistry, ClassRegistry, ComponentClass, Registry};
pub use world::{ActorId, ComponentId, ComponentKind, World};
