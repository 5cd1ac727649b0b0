//! USDA (ASCII) file parser.
//!
//! This module provides line-by-line parsing of USDA text into a `Stage`.
//!
//! # Supported Syntax
//!
//! - Layer metadata: `upAxis`, `metersPerUnit`, `defaultPrim`, `subLayers`
//! - `def`, `over` and `class` prims, typed or untyped, nested to any depth
//! - Prim metadata blocks `( ... )` (skipped)
//! - Attributes with `custom` / `uniform` qualifiers, default values and
//!   `.timeSamples` dictionaries, multi-line arrays
//! - `interpolation` attribute metadata
//! - Relationships `rel name = </path>` and `rel name = [</a>, </b>]`

use std::collections::VecDeque;

use thiserror::Error;
use usdx_math::UpAxis;

use super::literal::{value_from_literal, Literal, LiteralReader};
use crate::document::stage::{Attribute, PrimId, Specifier, Stage};
use crate::document::value::TimeCode;

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Unclosed block starting at line {0}")]
    UnclosedBlock(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

const QUALIFIERS: &[&str] = &[
    "custom", "uniform", "varying", "prepend", "append", "delete", "add", "reorder",
];

/// USDA file parser.
pub struct UsdaParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl UsdaParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    /// Parse everything into `stage`.
    pub fn parse_into(&mut self, stage: &mut Stage) -> ParseResult<()> {
        self.parse_header(stage)?;

        while let Some((line_num, line)) = self.next_line() {
            if is_prim_header(&line) {
                self.parse_prim(line, line_num, None, stage)?;
            } else {
                log::debug!("Skipping top-level statement at line {}: {}", line_num, line);
            }
        }

        Ok(())
    }

    fn error(&self, line: usize, message: impl Into<String>) -> ParseError {
        ParseError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Next non-empty, non-comment line, trimmed.
    fn next_line(&mut self) -> Option<(usize, String)> {
        while let Some((num, line)) = self.lines.pop_front() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                self.current_line = num;
                return Some((num, trimmed.to_string()));
            }
        }
        None
    }

    /// Extend `first` with following lines until its brackets balance.
    fn read_balanced(&mut self, first: String, braces: bool) -> ParseResult<String> {
        let mut text = first;
        let mut depth = bracket_delta(&text, braces);
        while depth > 0 {
            let (_, line) = self.lines.pop_front().ok_or(ParseError::UnexpectedEof)?;
            depth += bracket_delta(&line, braces);
            text.push('\n');
            text.push_str(line.trim());
        }
        Ok(text)
    }

    /// Parse the `( ... )` layer metadata block, if present.
    fn parse_header(&mut self, stage: &mut Stage) -> ParseResult<()> {
        let Some((line_num, line)) = self.next_line() else {
            return Ok(());
        };

        if !line.starts_with('(') {
            self.lines.push_front((line_num, line));
            return Ok(());
        }

        let block = self.read_balanced(line, false)?;
        let body = match (block.find('('), block.rfind(')')) {
            (Some(start), Some(end)) if start < end => &block[start + 1..end],
            _ => return Err(self.error(line_num, "Malformed layer metadata")),
        };

        let mut reader = LiteralReader::new(body);
        while !reader.at_end() {
            let key = match reader.read() {
                Ok(Literal::Ident(key)) => key,
                _ => break,
            };
            if reader.expect('=').is_err() {
                break;
            }
            let Ok(value) = reader.read() else {
                break;
            };

            let metadata = stage.metadata_mut();
            match key.as_str() {
                "upAxis" => {
                    if let Some(axis) = value.as_text().and_then(UpAxis::from_token) {
                        metadata.up_axis = axis;
                    }
                }
                "metersPerUnit" => {
                    if let Some(mpu) = value.as_f64() {
                        metadata.meters_per_unit = mpu as f32;
                    }
                }
                "defaultPrim" => {
                    metadata.default_prim = value.as_text().map(str::to_string);
                }
                "subLayers" => {
                    metadata.sub_layers = value
                        .items()
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|l| l.as_text().map(str::to_string))
                        .collect();
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse a prim header line and its body.
    fn parse_prim(
        &mut self,
        line: String,
        start_line: usize,
        parent: Option<PrimId>,
        stage: &mut Stage,
    ) -> ParseResult<()> {
        let header = self.read_balanced(line, false)?;

        let (keyword, rest) = header
            .split_once(char::is_whitespace)
            .ok_or_else(|| self.error(start_line, "Expected prim name"))?;
        let specifier = match keyword {
            "def" => Specifier::Def,
            "over" => Specifier::Over,
            _ => Specifier::Class,
        };

        // Type is everything before the quoted name
        let quote_start = rest
            .find('"')
            .ok_or_else(|| self.error(start_line, format!("Expected quoted prim name: {}", header)))?;
        let type_name = rest[..quote_start].trim();
        let after_quote = &rest[quote_start + 1..];
        let quote_end = after_quote
            .find('"')
            .ok_or_else(|| self.error(start_line, "Unterminated prim name"))?;
        let name = &after_quote[..quote_end];

        // Skip prim metadata; what follows it may hold the opening brace.
        let tail = &after_quote[quote_end + 1..];
        let after_metadata = if tail.trim_start().starts_with('(') {
            tail.rfind(')').map(|i| &tail[i + 1..]).unwrap_or("")
        } else {
            tail
        };

        let id = stage.add_prim(parent, name, type_name, specifier);

        match after_metadata.find('{') {
            Some(brace) => {
                let inline = &after_metadata[brace + 1..];
                if let Some(close) = inline.rfind('}') {
                    // Single-line prim: feed its content back as lines
                    self.lines.push_front((start_line, "}".to_string()));
                    for statement in inline[..close].split(';').rev() {
                        if !statement.trim().is_empty() {
                            self.lines.push_front((start_line, statement.to_string()));
                        }
                    }
                }
            }
            None => self.expect_opening_brace(start_line)?,
        }

        self.parse_body(id, start_line, stage)
    }

    /// Expect and consume an opening brace on its own line.
    fn expect_opening_brace(&mut self, start_line: usize) -> ParseResult<()> {
        match self.next_line() {
            Some((_, line)) if line == "{" => Ok(()),
            Some((num, line)) => Err(self.error(num, format!("Expected opening brace, found: {}", line))),
            None => Err(ParseError::UnclosedBlock(start_line)),
        }
    }

    /// Parse statements and children until the closing brace.
    fn parse_body(&mut self, id: PrimId, start_line: usize, stage: &mut Stage) -> ParseResult<()> {
        loop {
            let (line_num, line) = self
                .next_line()
                .ok_or(ParseError::UnclosedBlock(start_line))?;

            if line == "}" {
                return Ok(());
            }

            // Check for child prim FIRST (def lines may contain attribute-like text)
            if is_prim_header(&line) {
                self.parse_prim(line, line_num, Some(id), stage)?;
                continue;
            }

            let statement = self.read_balanced(line, true)?;
            self.parse_statement(id, &statement, line_num, stage)?;
        }
    }

    /// Parse one attribute or relationship statement.
    fn parse_statement(
        &self,
        id: PrimId,
        statement: &str,
        line_num: usize,
        stage: &mut Stage,
    ) -> ParseResult<()> {
        let (decl, value_text) = match find_top_level(statement, '=') {
            Some(eq) => (&statement[..eq], Some(&statement[eq + 1..])),
            None => (statement, None),
        };

        // A declaration without value may still carry metadata
        let (decl, decl_metadata) = match decl.find('(') {
            Some(paren) => (&decl[..paren], Some(&decl[paren..])),
            None => (decl, None),
        };

        let mut custom = false;
        let mut uniform = false;
        let mut words: Vec<&str> = decl.split_whitespace().collect();
        while let Some(first) = words.first().copied() {
            if !QUALIFIERS.contains(&first) {
                break;
            }
            custom |= first == "custom";
            uniform |= first == "uniform";
            words.remove(0);
        }

        if words.first() == Some(&"rel") {
            let Some(rel_name) = words.get(1) else {
                return Err(self.error(line_num, "Relationship without a name"));
            };
            let targets = match value_text {
                Some(text) => {
                    let lit = LiteralReader::new(text)
                        .read()
                        .map_err(|m| self.error(line_num, m))?;
                    match lit.items() {
                        Some(items) => items
                            .iter()
                            .filter_map(|l| l.as_text().map(str::to_string))
                            .collect(),
                        None => lit.as_text().map(str::to_string).into_iter().collect(),
                    }
                }
                None => Vec::new(),
            };
            stage.set_relationship(id, rel_name, targets);
            return Ok(());
        }

        let [type_name, full_name] = match words.as_slice() {
            [t, n] => [*t, *n],
            _ => {
                log::debug!("Skipping statement at line {}: {}", line_num, statement);
                return Ok(());
            }
        };

        if full_name.ends_with(".connect") {
            return Ok(());
        }
        let (name, sampled) = match full_name.strip_suffix(".timeSamples") {
            Some(name) => (name, true),
            None => (full_name, false),
        };

        let mut attr = Attribute::new(type_name);
        attr.custom = custom;
        attr.uniform = uniform;

        let mut metadata = decl_metadata.map(str::to_string);
        if let Some(text) = value_text {
            let mut reader = LiteralReader::new(text);
            let lit = reader.read().map_err(|m| self.error(line_num, m))?;

            match (&lit, sampled) {
                (Literal::Dict(entries), true) => {
                    for (time, sample) in entries {
                        if let Some(value) = value_from_literal(type_name, sample) {
                            attr.set(value, TimeCode::At(*time));
                        }
                    }
                }
                (_, true) => {
                    return Err(self.error(line_num, "Expected time sample dictionary"));
                }
                (_, false) => attr.default = value_from_literal(type_name, &lit),
            }

            let rest = reader.remainder();
            if rest.trim_start().starts_with('(') {
                metadata = Some(rest);
            }
        }
        attr.interpolation = metadata.as_deref().and_then(|m| quoted_after(m, "interpolation"));

        match stage.attribute_mut(id, name) {
            Some(existing) => {
                if attr.default.is_some() {
                    existing.default = attr.default;
                }
                for (time, value) in attr.time_samples {
                    existing.set(value, TimeCode::At(time));
                }
                if attr.interpolation.is_some() {
                    existing.interpolation = attr.interpolation;
                }
            }
            None => stage.insert_attribute(id, name, attr),
        }

        Ok(())
    }
}

fn is_prim_header(line: &str) -> bool {
    ["def ", "over ", "class "]
        .iter()
        .any(|kw| line.starts_with(kw))
}

/// Net bracket depth of a line, ignoring quoted text.
fn bracket_delta(line: &str, braces: bool) -> i32 {
    let mut depth = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for c in line.chars() {
        if in_quotes {
            match c {
                '\\' if !escaped => {
                    escaped = true;
                    continue;
                }
                '"' if !escaped => in_quotes = false,
                _ => {}
            }
            escaped = false;
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '{' if braces => depth += 1,
            '}' if braces => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Position of `target` outside brackets and quotes.
fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth = 0;
    let mut in_quotes = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// The quoted string following `key =` in a metadata block.
fn quoted_after(metadata: &str, key: &str) -> Option<String> {
    let after_key = &metadata[metadata.find(key)? + key.len()..];
    let after_eq = &after_key[after_key.find('=')? + 1..];
    let start = after_eq.find('"')? + 1;
    let end = after_eq[start..].find('"')? + start;
    Some(after_eq[start..end].to_string())
}

/// Parse USDA text into `stage`.
pub fn parse_stage(content: &str, stage: &mut Stage) -> ParseResult<()> {
    let mut parser = UsdaParser::new(content);
    parser.parse_into(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AttrValue;
    use usdx_math::Vec3;

    fn parse(content: &str) -> Stage {
        let mut stage = Stage::new("test.usda");
        parse_stage(content, &mut stage).unwrap();
        stage
    }

    #[test]
    fn test_layer_metadata() {
        let stage = parse(
            r#"#usda 1.0
(
    defaultPrim = "Root"
    metersPerUnit = 1
    upAxis = "Y"
    subLayers = [
        @./layout.usda@
    ]
)

def Xform "Root"
{
}
"#,
        );
        let meta = stage.metadata();
        assert_eq!(meta.default_prim.as_deref(), Some("Root"));
        assert_eq!(meta.up_axis, UpAxis::Y);
        assert_eq!(meta.meters_per_unit, 1.0);
        assert_eq!(meta.sub_layers, vec!["./layout.usda".to_string()]);
        assert!(stage.default_prim().is_some());
    }

    #[test]
    fn test_parse_simple_mesh() {
        let stage = parse(
            r#"
def Mesh "Cube" {
    point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0), (0, 1, 0)]
    int[] faceVertexCounts = [4]
    int[] faceVertexIndices = [0, 1, 2, 3]
}
"#,
        );
        let cube = stage.prim_at_path("/Cube").unwrap();
        assert_eq!(stage.prim(cube).type_name, "Mesh");
        let points = stage.get(cube, "points", TimeCode::Default).unwrap();
        assert_eq!(points.as_vec3_array().unwrap().len(), 4);
        assert_eq!(stage.attribute(cube, "points").unwrap().type_name, "point3f[]");
    }

    #[test]
    fn test_custom_attributes_and_nesting() {
        let stage = parse(
            r#"
def Xform "Root" (
    kind = "assembly"
)
{
    def Xform "Cube1"
    {
        custom string unrealPrimUsage = "actor"
        custom string unrealClassReference = "/Script/Engine.StaticMeshActor"
        double3 xformOp:translate = (1, 2, 3)
        uniform token[] xformOpOrder = ["xformOp:translate"]

        def Mesh "Mesh"
        {
            custom string unrealInstanceReference = "Level.Cube1.Mesh"
        }
    }
}
"#,
        );
        let cube = stage.prim_at_path("/Root/Cube1").unwrap();
        assert_eq!(stage.get_str(cube, "unrealPrimUsage"), Some("actor"));
        assert!(stage.attribute(cube, "unrealPrimUsage").unwrap().custom);
        assert_eq!(
            stage.get(cube, "xformOp:translate", TimeCode::Default),
            Some(&AttrValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert!(stage.attribute(cube, "xformOpOrder").unwrap().uniform);

        let mesh = stage.prim_at_path("/Root/Cube1/Mesh").unwrap();
        assert_eq!(stage.prim(mesh).parent, Some(cube));
        assert_eq!(stage.get_str(mesh, "unrealInstanceReference"), Some("Level.Cube1.Mesh"));
    }

    #[test]
    fn test_time_samples_multiline() {
        let stage = parse(
            r#"
def PointInstancer "Foliage"
{
    int[] protoIndices.timeSamples = {
        0: [0, 1,
            0],
        5: [1],
    }
    rel prototypes = [
        </Foliage/Prototypes/Grass>,
        </Foliage/Prototypes/Rock>,
    ]
}
"#,
        );
        let id = stage.prim_at_path("/Foliage").unwrap();
        let at0 = stage.get(id, "protoIndices", TimeCode::At(0.0)).unwrap();
        assert_eq!(at0.as_int_array(), Some(&[0, 1, 0][..]));
        let at7 = stage.get(id, "protoIndices", TimeCode::At(7.0)).unwrap();
        assert_eq!(at7.as_int_array(), Some(&[1][..]));
        assert_eq!(stage.relationship(id, "prototypes").unwrap().len(), 2);
    }

    #[test]
    fn test_interpolation_metadata() {
        let stage = parse(
            r#"
def Mesh "Quad"
{
    texCoord2f[] primvars:st = [(0, 0), (1, 0), (1, 1)] (
        interpolation = "faceVarying"
    )
}
"#,
        );
        let id = stage.prim_at_path("/Quad").unwrap();
        let attr = stage.attribute(id, "primvars:st").unwrap();
        assert_eq!(attr.interpolation.as_deref(), Some("faceVarying"));
        assert_eq!(attr.default.as_ref().unwrap().as_vec2_array().unwrap().len(), 3);
    }

    #[test]
    fn test_over_merges_into_def() {
        let stage = parse(
            r#"
def Xform "Root"
{
}

over "Root"
{
    token visibility = "invisible"
}
"#,
        );
        assert_eq!(stage.prim_count(), 1);
        let root = stage.prim_at_path("/Root").unwrap();
        assert_eq!(stage.prim(root).type_name, "Xform");
        assert_eq!(stage.get_str(root, "visibility"), Some("invisible"));
    }

    #[test]
    fn test_single_line_prim() {
        let stage = parse(
            r#"
def Xform "Root"
{
    def Scope "Empty" {}
    def Xform "Moved" { double3 xformOp:translate = (0, 0, 5) }
}
"#,
        );
        assert!(stage.prim_at_path("/Root/Empty").is_some());
        let moved = stage.prim_at_path("/Root/Moved").unwrap();
        assert!(stage.attribute(moved, "xformOp:translate").is_some());
    }

    #[test]
    fn test_unclosed_block() {
        let mut stage = Stage::new("bad.usda");
        let result = parse_stage("def Xform \"Root\"\n{\n", &mut stage);
        assert!(matches!(result, Err(ParseError::UnclosedBlock(_))));
    }
}
