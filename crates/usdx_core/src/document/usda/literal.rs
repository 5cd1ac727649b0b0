//! Untyped USDA value literals and their conversion to typed values.

use half::f16;
use usdx_math::{Mat4, Quat, Vec2, Vec3};

use crate::document::value::{AttrValue, Quath};

const VEC2_TYPES: &[&str] = &[
    "float2", "double2", "half2", "texCoord2f", "texCoord2d", "texCoord2h",
];

const VEC3_TYPES: &[&str] = &[
    "float3", "double3", "half3", "point3f", "point3d", "point3h", "normal3f", "normal3d",
    "vector3f", "vector3d", "color3f", "color3d", "texCoord3f",
];

/// A value as written, before its declared type is applied.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Literal {
    Number(f64),
    Str(String),
    Ident(String),
    Asset(String),
    Path(String),
    Tuple(Vec<Literal>),
    List(Vec<Literal>),
    Dict(Vec<(f64, Literal)>),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Ident(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Str(s) | Literal::Ident(s) | Literal::Asset(s) | Literal::Path(s) => Some(s),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Literal]> {
        match self {
            Literal::Tuple(v) | Literal::List(v) => Some(v),
            _ => None,
        }
    }
}

/// Character cursor over a value's text.
pub(crate) struct LiteralReader {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralReader {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    /// Text after the last literal read.
    pub fn remainder(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// True once only whitespace remains.
    pub fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    pub fn expect(&mut self, c: char) -> Result<(), String> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected '{}'", c))
        }
    }

    /// Read one literal.
    pub fn read(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("unexpected end of value".to_string()),
            Some('"') | Some('\'') => self.read_string().map(Literal::Str),
            Some('(') => self.read_sequence(')').map(Literal::Tuple),
            Some('[') => self.read_sequence(']').map(Literal::List),
            Some('{') => self.read_dict(),
            Some('@') => self.read_delimited('@', '@').map(Literal::Asset),
            Some('<') => self.read_delimited('<', '>').map(Literal::Path),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.read_number(),
            Some(c) if c.is_alphabetic() || c == '_' => Ok(Literal::Ident(self.read_ident())),
            Some(c) => Err(format!("unexpected character '{}'", c)),
        }
    }

    fn read_string(&mut self) -> Result<String, String> {
        let quote = self.peek().unwrap_or('"');
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek().ok_or("unterminated escape")?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err("unterminated string".to_string())
    }

    fn read_delimited(&mut self, open: char, close: char) -> Result<String, String> {
        self.expect(open)?;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == close {
                return Ok(out);
            }
            out.push(c);
        }
        Err(format!("missing closing '{}'", close))
    }

    fn read_sequence(&mut self, close: char) -> Result<Vec<Literal>, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                None => return Err(format!("missing closing '{}'", close)),
                _ => {}
            }

            items.push(self.read()?);

            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(format!("expected ',' or '{}'", close)),
            }
        }
    }

    fn read_dict(&mut self) -> Result<Literal, String> {
        self.pos += 1;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(Literal::Dict(entries));
                }
                None => return Err("missing closing '}'".to_string()),
                _ => {}
            }

            let key = self
                .read()?
                .as_f64()
                .ok_or("time sample keys must be numbers")?;
            self.expect(':')?;
            let value = self.read()?;
            entries.push((key, value));

            self.skip_ws();
            if self.peek() == Some(',') {
                self.pos += 1;
            }
        }
    }

    fn read_number(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| format!("invalid number '{}'", text))
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | ':' | '.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn floats<const N: usize>(lit: &Literal) -> Option<[f32; N]> {
    let items = lit.items()?;
    if items.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

fn vec2(lit: &Literal) -> Option<Vec2> {
    floats::<2>(lit).map(Vec2::from_array)
}

fn vec3(lit: &Literal) -> Option<Vec3> {
    floats::<3>(lit).map(Vec3::from_array)
}

/// Quaternions are written real part first.
fn quat(lit: &Literal) -> Option<Quat> {
    floats::<4>(lit).map(|[w, x, y, z]| Quat::from_xyzw(x, y, z, w))
}

fn quath(lit: &Literal) -> Option<Quath> {
    let items = lit.items()?;
    if items.len() != 4 {
        return None;
    }
    let h = |i: usize| items[i].as_f64().map(f16::from_f64);
    Some(Quath {
        w: h(0)?,
        x: h(1)?,
        y: h(2)?,
        z: h(3)?,
    })
}

/// Matrices are written as rows of a row-vector matrix, which are the
/// columns of the equivalent column-vector matrix.
fn matrix(lit: &Literal) -> Option<Mat4> {
    let rows = lit.items()?;
    if rows.len() != 4 {
        return None;
    }
    let mut cols = [[0.0f32; 4]; 4];
    for (col, row) in cols.iter_mut().zip(rows) {
        *col = floats::<4>(row)?;
    }
    Some(Mat4::from_cols_array_2d(&cols))
}

fn list_of<T>(lit: &Literal, f: impl Fn(&Literal) -> Option<T>) -> Option<Vec<T>> {
    lit.items()?.iter().map(f).collect()
}

fn text(lit: &Literal) -> Option<String> {
    lit.as_text().map(str::to_string)
}

/// Apply a declared type to a literal. `None` for blocked values and for
/// types the document model does not carry.
pub(crate) fn value_from_literal(type_name: &str, lit: &Literal) -> Option<AttrValue> {
    if matches!(lit, Literal::Ident(s) if s == "None") {
        return None;
    }

    let (base, is_array) = match type_name.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (type_name, false),
    };

    if is_array {
        return match base {
            "string" | "asset" => list_of(lit, text).map(AttrValue::StringArray),
            "token" => list_of(lit, text).map(AttrValue::TokenArray),
            "int" | "uint" | "int64" => {
                list_of(lit, |l| l.as_f64().map(|n| n as i32)).map(AttrValue::IntArray)
            }
            "float" | "double" | "half" => {
                list_of(lit, |l| l.as_f64().map(|n| n as f32)).map(AttrValue::FloatArray)
            }
            "quath" => list_of(lit, quath).map(AttrValue::QuathArray),
            "quatf" | "quatd" => list_of(lit, quat).map(AttrValue::QuatArray),
            "matrix4d" => list_of(lit, matrix).map(AttrValue::MatrixArray),
            t if VEC2_TYPES.contains(&t) => list_of(lit, vec2).map(AttrValue::Vec2Array),
            t if VEC3_TYPES.contains(&t) => list_of(lit, vec3).map(AttrValue::Vec3Array),
            _ => None,
        };
    }

    match base {
        "bool" => match lit {
            Literal::Ident(s) => Some(AttrValue::Bool(s == "true")),
            _ => lit.as_f64().map(|n| AttrValue::Bool(n != 0.0)),
        },
        "int" | "uint" | "int64" => lit.as_f64().map(|n| AttrValue::Int(n as i32)),
        "float" | "double" | "half" | "timecode" => lit.as_f64().map(AttrValue::Float),
        "string" | "asset" => text(lit).map(AttrValue::String),
        "token" => text(lit).map(AttrValue::Token),
        "quath" | "quatf" | "quatd" => quat(lit).map(AttrValue::Quat),
        "matrix4d" => matrix(lit).map(AttrValue::Matrix),
        t if VEC3_TYPES.contains(&t) => vec3(lit).map(AttrValue::Vec3),
        _ => None,
    }
}
