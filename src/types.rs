//! Core types and constants for the layout bytecode

use serde::Serialize;
use std::fmt;

// Bytecode constants

/// Ends the property section of a widget record
pub const PROPERTY_TERMINATOR: u8 = 0x00;
/// Ends the child list of a widget record
pub const WIDGET_TERMINATOR: u8 = 0x00;
/// Set on a property id to mark the property as a binding
pub const BINDING_FLAG: u8 = 0x80;

/// Widget body nesting allowed by default
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Declared type of a property value; selects the literal encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Integer,
    Number,
    Enumeration,
    String,
    Boolean,
    Margins,
    SizeList,
    Resource,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Enumeration => "enumeration",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Margins => "margins",
            ValueType::SizeList => "size-list",
            ValueType::Resource => "resource",
        };
        f.write_str(name)
    }
}

/// One entry of a size list
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SizeItem {
    Auto,
    Expand,
    Pixels(u32),
    /// Stored as a fraction, `25%` is `0.25`
    Percentage(f32),
}

impl SizeItem {
    /// 2-bit wire tag
    pub fn tag(&self) -> u8 {
        match self {
            SizeItem::Auto => 0,
            SizeItem::Expand => 1,
            SizeItem::Pixels(_) => 2,
            SizeItem::Percentage(_) => 3,
        }
    }
}

impl fmt::Display for SizeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeItem::Auto => f.write_str("auto"),
            SizeItem::Expand => f.write_str("expand"),
            SizeItem::Pixels(px) => write!(f, "{}", px),
            SizeItem::Percentage(fraction) => write!(f, "{}%", fraction * 100.0),
        }
    }
}

/// Packs size-list tags, four per byte, first item in the low bits
pub fn pack_size_tags(items: &[SizeItem]) -> Vec<u8> {
    items
        .chunks(4)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |byte, (j, item)| byte | ((item.tag() & 0x3) << (2 * j)))
        })
        .collect()
}

/// Four margin values in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margins(pub [u32; 4]);

impl Margins {
    /// Applies the broadcast rule: `v` -> `v,v,v,v`, `a,b` -> `a,b,a,b`
    pub fn broadcast(values: &[u32]) -> Option<Self> {
        match *values {
            [v] => Some(Self([v, v, v, v])),
            [a, b] => Some(Self([a, b, a, b])),
            [a, b, c, d] => Some(Self([a, b, c, d])),
            _ => None,
        }
    }
}

impl fmt::Display for Margins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}, {}, {}, {}", a, b, c, d)
    }
}
