//! In-memory stage: an arena of prims addressed by path.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use usdx_math::{StageAxes, UpAxis, RUNTIME_METERS_PER_UNIT};

use super::usda::{parse_stage, write_stage};
use super::value::{AttrValue, TimeCode};
use super::{DocumentError, DocumentResult};

/// Identity of a prim within one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimId(usize);

impl PrimId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a prim was authored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Specifier {
    Def,
    Over,
    Class,
}

impl Specifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Specifier::Def => "def",
            Specifier::Over => "over",
            Specifier::Class => "class",
        }
    }
}

/// A named, typed attribute with an optional default and time samples.
#[derive(Clone, Debug)]
pub struct Attribute {
    /// Declared type, e.g. `point3f[]`
    pub type_name: String,

    /// Authored with the `custom` keyword
    pub custom: bool,

    /// Authored with the `uniform` variability
    pub uniform: bool,

    /// `interpolation` metadata of primvars
    pub interpolation: Option<String>,

    pub default: Option<AttrValue>,

    /// Samples sorted by time
    pub time_samples: Vec<(f64, AttrValue)>,

    /// Index of the layer this opinion was last authored in
    pub layer: usize,
}

impl Attribute {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            custom: false,
            uniform: false,
            interpolation: None,
            default: None,
            time_samples: Vec::new(),
            layer: 0,
        }
    }

    /// Resolve the value at `time`.
    ///
    /// The default time reads the default value, falling back to the
    /// earliest sample. A sampled time holds the last sample at or before it.
    pub fn get(&self, time: TimeCode) -> Option<&AttrValue> {
        match time {
            TimeCode::Default => self
                .default
                .as_ref()
                .or_else(|| self.time_samples.first().map(|(_, v)| v)),
            TimeCode::At(t) => {
                if self.time_samples.is_empty() {
                    return self.default.as_ref();
                }
                self.time_samples
                    .iter()
                    .rev()
                    .find(|(st, _)| *st <= t)
                    .or_else(|| self.time_samples.first())
                    .map(|(_, v)| v)
            }
        }
    }

    pub fn set(&mut self, value: AttrValue, time: TimeCode) {
        match time {
            TimeCode::Default => self.default = Some(value),
            TimeCode::At(t) => {
                match self
                    .time_samples
                    .binary_search_by(|(st, _)| st.total_cmp(&t))
                {
                    Ok(i) => self.time_samples[i].1 = value,
                    Err(i) => self.time_samples.insert(i, (t, value)),
                }
            }
        }
    }

    pub fn has_value(&self) -> bool {
        self.default.is_some() || !self.time_samples.is_empty()
    }
}

/// A node of the document tree.
#[derive(Clone, Debug)]
pub struct Prim {
    pub name: String,
    pub path: String,
    pub type_name: String,
    pub specifier: Specifier,
    pub parent: Option<PrimId>,
    pub children: Vec<PrimId>,
    pub attributes: IndexMap<String, Attribute>,
    pub relationships: IndexMap<String, Vec<String>>,
}

/// Layer-level metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct StageMetadata {
    pub up_axis: UpAxis,
    pub meters_per_unit: f32,
    pub default_prim: Option<String>,
    pub sub_layers: Vec<String>,
}

impl Default for StageMetadata {
    fn default() -> Self {
        Self {
            up_axis: UpAxis::Z,
            meters_per_unit: RUNTIME_METERS_PER_UNIT,
            default_prim: None,
            sub_layers: Vec::new(),
        }
    }
}

/// An open document.
#[derive(Clone, Debug)]
pub struct Stage {
    identifier: String,
    metadata: StageMetadata,
    prims: Vec<Prim>,
    roots: Vec<PrimId>,
    paths: HashMap<String, PrimId>,
    edit_target: usize,
}

impl Stage {
    /// Create an empty stage whose root layer is `identifier`.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            metadata: StageMetadata::default(),
            prims: Vec::new(),
            roots: Vec::new(),
            paths: HashMap::new(),
            edit_target: 0,
        }
    }

    /// Open a USDA file.
    pub fn open(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let stage = Self::from_usda(path.to_string_lossy(), &content)?;
        log::info!("Opened stage {} ({} prims)", stage.identifier, stage.prim_count());
        Ok(stage)
    }

    /// Parse USDA text into a stage named `identifier`.
    pub fn from_usda(identifier: impl Into<String>, content: &str) -> DocumentResult<Self> {
        let mut stage = Self::new(identifier);
        parse_stage(content, &mut stage)?;
        Ok(stage)
    }

    /// Serialize to USDA text.
    pub fn to_usda(&self) -> String {
        write_stage(self)
    }

    /// Write the stage to its root layer file.
    pub fn save(&self) -> DocumentResult<()> {
        self.export(&self.identifier)
    }

    /// Write the stage to an arbitrary file.
    pub fn export(&self, path: impl AsRef<Path>) -> DocumentResult<()> {
        fs::write(path.as_ref(), self.to_usda())?;
        log::info!("Saved stage to {}", path.as_ref().display());
        Ok(())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn metadata(&self) -> &StageMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut StageMetadata {
        &mut self.metadata
    }

    pub fn axes(&self) -> StageAxes {
        StageAxes::new(self.metadata.up_axis, self.metadata.meters_per_unit)
    }

    pub fn set_axes(&mut self, axes: StageAxes) {
        self.metadata.up_axis = axes.up_axis;
        self.metadata.meters_per_unit = axes.meters_per_unit;
    }

    /// Root layer followed by sublayers.
    pub fn layers(&self) -> Vec<&str> {
        std::iter::once(self.identifier.as_str())
            .chain(self.metadata.sub_layers.iter().map(String::as_str))
            .collect()
    }

    pub fn edit_target(&self) -> &str {
        self.layers()
            .get(self.edit_target)
            .copied()
            .unwrap_or(self.identifier.as_str())
    }

    /// Direct subsequent edits to `layer`, which must be the root layer or one
    /// of its sublayers. Sublayers match by their authored path or by that
    /// path resolved against the root layer's directory.
    pub fn set_edit_target(&mut self, layer: &str) -> DocumentResult<()> {
        let root_dir = Path::new(&self.identifier).parent().map(Path::to_path_buf);
        let index = self.layers().iter().position(|candidate| {
            *candidate == layer
                || root_dir
                    .as_ref()
                    .map(|dir| dir.join(candidate) == Path::new(layer))
                    .unwrap_or(false)
        });

        match index {
            Some(i) => {
                self.edit_target = i;
                log::debug!("Edit target set to {}", layer);
                Ok(())
            }
            None => Err(DocumentError::LayerNotFound(layer.to_string())),
        }
    }

    pub fn prim_count(&self) -> usize {
        self.prims.len()
    }

    pub fn prim(&self, id: PrimId) -> &Prim {
        &self.prims[id.0]
    }

    pub fn prim_at_path(&self, path: &str) -> Option<PrimId> {
        self.paths.get(path).copied()
    }

    pub fn root_prims(&self) -> &[PrimId] {
        &self.roots
    }

    pub fn children(&self, id: PrimId) -> &[PrimId] {
        &self.prims[id.0].children
    }

    pub fn child_named(&self, id: PrimId, name: &str) -> Option<PrimId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.prims[c.0].name == name)
    }

    /// The prim and every prim below it, parents before children.
    pub fn subtree(&self, id: PrimId) -> Vec<PrimId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn default_prim(&self) -> Option<PrimId> {
        self.metadata
            .default_prim
            .as_ref()
            .and_then(|name| self.prim_at_path(&format!("/{}", name)))
    }

    pub fn set_default_prim(&mut self, id: PrimId) {
        self.metadata.default_prim = Some(self.prims[id.0].name.clone());
    }

    /// Define a typed prim, creating untyped ancestors as needed. An existing
    /// prim is retyped.
    pub fn define_prim(&mut self, path: &str, type_name: &str) -> DocumentResult<PrimId> {
        let id = self.ensure_prim(path, Specifier::Def)?;
        let prim = &mut self.prims[id.0];
        prim.specifier = Specifier::Def;
        prim.type_name = type_name.to_string();
        Ok(id)
    }

    /// Get or create a non-destructive override at `path`.
    pub fn override_prim(&mut self, path: &str) -> DocumentResult<PrimId> {
        self.ensure_prim(path, Specifier::Over)
    }

    /// Get or create an override at `path`, typing it only if untyped.
    pub fn override_typed(&mut self, path: &str, type_name: &str) -> DocumentResult<PrimId> {
        let id = self.ensure_prim(path, Specifier::Over)?;
        let prim = &mut self.prims[id.0];
        if prim.type_name.is_empty() {
            prim.type_name = type_name.to_string();
        }
        Ok(id)
    }

    fn ensure_prim(&mut self, path: &str, specifier: Specifier) -> DocumentResult<PrimId> {
        if let Some(id) = self.prim_at_path(path) {
            return Ok(id);
        }

        let segments = split_path(path)?;
        let mut parent = None;
        let mut current = String::new();
        let mut id = None;
        for segment in segments {
            current.push('/');
            current.push_str(segment);
            let next = match self.prim_at_path(&current) {
                Some(existing) => existing,
                None => self.add_prim(parent, segment, "", specifier),
            };
            parent = Some(next);
            id = Some(next);
        }

        id.ok_or_else(|| DocumentError::InvalidPath(path.to_string()))
    }

    /// Append a prim under `parent`, or merge into an existing prim of the
    /// same path.
    pub(crate) fn add_prim(
        &mut self,
        parent: Option<PrimId>,
        name: &str,
        type_name: &str,
        specifier: Specifier,
    ) -> PrimId {
        let path = match parent {
            Some(p) => format!("{}/{}", self.prims[p.0].path, name),
            None => format!("/{}", name),
        };

        if let Some(existing) = self.prim_at_path(&path) {
            let prim = &mut self.prims[existing.0];
            if !type_name.is_empty() {
                prim.type_name = type_name.to_string();
            }
            if specifier == Specifier::Def {
                prim.specifier = Specifier::Def;
            }
            return existing;
        }

        let id = PrimId(self.prims.len());
        self.prims.push(Prim {
            name: name.to_string(),
            path: path.clone(),
            type_name: type_name.to_string(),
            specifier,
            parent,
            children: Vec::new(),
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
        });
        self.paths.insert(path, id);
        match parent {
            Some(p) => self.prims[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn attribute(&self, id: PrimId, name: &str) -> Option<&Attribute> {
        self.prims[id.0].attributes.get(name)
    }

    pub fn get(&self, id: PrimId, name: &str, time: TimeCode) -> Option<&AttrValue> {
        self.attribute(id, name).and_then(|a| a.get(time))
    }

    /// String or token value at the default time.
    pub fn get_str(&self, id: PrimId, name: &str) -> Option<&str> {
        self.get(id, name, TimeCode::Default).and_then(AttrValue::as_str)
    }

    /// Author a value, creating a schema attribute typed from the value.
    pub fn set(&mut self, id: PrimId, name: &str, value: AttrValue, time: TimeCode) {
        let type_name = value.default_type_name();
        self.set_typed(id, name, type_name, value, time, false);
    }

    /// Author a value on a `custom` attribute.
    pub fn set_custom(&mut self, id: PrimId, name: &str, value: AttrValue, time: TimeCode) {
        let type_name = value.default_type_name();
        self.set_typed(id, name, type_name, value, time, true);
    }

    /// Author a value with an explicit declared type.
    pub fn set_typed(
        &mut self,
        id: PrimId,
        name: &str,
        type_name: &str,
        value: AttrValue,
        time: TimeCode,
        custom: bool,
    ) {
        let layer = self.edit_target;
        let attr = self.prims[id.0]
            .attributes
            .entry(name.to_string())
            .or_insert_with(|| {
                let mut attr = Attribute::new(type_name);
                attr.custom = custom;
                attr
            });
        attr.layer = layer;
        attr.set(value, time);
    }

    pub fn attribute_mut(&mut self, id: PrimId, name: &str) -> Option<&mut Attribute> {
        self.prims[id.0].attributes.get_mut(name)
    }

    pub(crate) fn insert_attribute(&mut self, id: PrimId, name: &str, mut attr: Attribute) {
        attr.layer = self.edit_target;
        self.prims[id.0].attributes.insert(name.to_string(), attr);
    }

    pub fn relationship(&self, id: PrimId, name: &str) -> Option<&[String]> {
        self.prims[id.0].relationships.get(name).map(Vec::as_slice)
    }

    pub fn set_relationship(&mut self, id: PrimId, name: &str, targets: Vec<String>) {
        self.prims[id.0]
            .relationships
            .insert(name.to_string(), targets);
    }
}

/// Split an absolute prim path into its segments.
fn split_path(path: &str) -> DocumentResult<Vec<&str>> {
    let invalid = || DocumentError::InvalidPath(path.to_string());
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let segments: Vec<&str> = rest.split('/').collect();
    if segments.iter().any(|s| !is_valid_identifier(s)) {
        return Err(invalid());
    }
    Ok(segments)
}

/// Prim names are identifiers: a letter or underscore, then alphanumerics.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turn an arbitrary label into a valid prim name.
pub fn make_valid_identifier(label: &str) -> String {
    let mut name: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// Last segment of a prim path.
pub fn path_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
