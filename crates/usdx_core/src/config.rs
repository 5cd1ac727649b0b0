//! Conversion settings, loadable from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use usdx_math::{StageAxes, UpAxis, RUNTIME_METERS_PER_UNIT};

use crate::error::ConversionResult;

/// Axis and unit convention authored on stages the converter creates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOptions {
    #[serde(rename = "upAxis")]
    pub up_axis: UpAxis,

    #[serde(rename = "metersPerUnit")]
    pub meters_per_unit: f32,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            up_axis: UpAxis::Z,
            meters_per_unit: RUNTIME_METERS_PER_UNIT,
        }
    }
}

impl StageOptions {
    pub fn axes(&self) -> StageAxes {
        StageAxes::new(self.up_axis, self.meters_per_unit)
    }
}

/// Settings shared by the context and the level exporter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub stage: StageOptions,

    /// Name of the default prim holding exported content
    #[serde(rename = "rootPrimName")]
    pub root_prim_name: String,

    /// Write actor folders as `Scope` prims
    #[serde(rename = "exportActorFolders")]
    pub export_actor_folders: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            stage: StageOptions::default(),
            root_prim_name: "Root".to_string(),
            export_actor_folders: true,
        }
    }
}

impl ConversionSettings {
    pub fn with_stage(mut self, up_axis: UpAxis, meters_per_unit: f32) -> Self {
        self.stage = StageOptions {
            up_axis,
            meters_per_unit,
        };
        self
    }

    pub fn with_root_prim_name(mut self, name: impl Into<String>) -> Self {
        self.root_prim_name = name.into();
        self
    }

    pub fn from_json(text: &str) -> ConversionResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> ConversionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ConversionResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&text)?;
        log::debug!("Loaded conversion settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ConversionResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
