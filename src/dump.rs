//! Bytecode decoding for inspection
//!
//! Parses a compiled widget record back into a tree, resolving tags and ids
//! through the static registries. The declared type of each property tells
//! the decoder how its payload is encoded.

use crate::codec::ReadBytecodeExt;
use crate::encoder::Value;
use crate::error::{CompilerError, Result};
use crate::schema::SymbolTables;
use crate::types::{Margins, SizeItem, ValueType, BINDING_FLAG, PROPERTY_TERMINATOR, WIDGET_TERMINATOR};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Cursor};

/// Nesting accepted when decoding untrusted bytecode
pub const MAX_DECODE_DEPTH: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetNode {
    pub widget: &'static str,
    pub tag: u8,
    pub properties: Vec<PropertyNode>,
    pub children: Vec<WidgetNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyNode {
    pub name: &'static str,
    pub id: u8,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Literal(Value),
    /// Host property id the value is bound to
    Binding(u32),
}

impl WidgetNode {
    /// Number of widgets in this subtree, including this one
    pub fn widget_count(&self) -> usize {
        1 + self.children.iter().map(WidgetNode::widget_count).sum::<usize>()
    }
}

/// Decodes one widget document with the shipped registries
pub fn decode(bytes: &[u8]) -> Result<WidgetNode> {
    decode_with(SymbolTables::global(), bytes)
}

pub fn decode_with(symbols: &SymbolTables, bytes: &[u8]) -> Result<WidgetNode> {
    let mut decoder = Decoder {
        symbols,
        cursor: Cursor::new(bytes),
    };
    let tag = decoder.tag()?;
    let root = decoder.widget(tag, 1)?;

    let consumed = decoder.offset();
    if consumed != bytes.len() {
        return Err(CompilerError::invalid_format(format!(
            "{} trailing bytes after the root widget",
            bytes.len() - consumed
        )));
    }
    Ok(root)
}

struct Decoder<'a> {
    symbols: &'a SymbolTables,
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    fn offset(&self) -> usize {
        self.cursor.position() as usize
    }

    fn malformed(&self, what: &str, e: io::Error) -> CompilerError {
        CompilerError::invalid_format(format!("{} at offset {}: {}", what, self.offset(), e))
    }

    fn tag(&mut self) -> Result<u8> {
        self.cursor.read_tag().map_err(|e| self.malformed("tag", e))
    }

    fn varint(&mut self) -> Result<u32> {
        self.cursor.read_varint().map_err(|e| self.malformed("varint", e))
    }

    fn float(&mut self) -> Result<f32> {
        self.cursor.read_float32().map_err(|e| self.malformed("float", e))
    }

    fn widget(&mut self, tag: u8, depth: usize) -> Result<WidgetNode> {
        if depth > MAX_DECODE_DEPTH {
            return Err(CompilerError::LimitExceeded {
                limit_type: "decoded widget nesting depth".to_string(),
                limit: MAX_DECODE_DEPTH,
            });
        }

        let widget = *self.symbols.widget_by_tag(tag).ok_or_else(|| {
            CompilerError::invalid_format(format!(
                "unknown widget tag 0x{:02x} at offset {}",
                tag,
                self.offset().saturating_sub(1)
            ))
        })?;

        let mut properties = Vec::new();
        loop {
            let raw = self.tag()?;
            if raw == PROPERTY_TERMINATOR {
                break;
            }
            let id = raw & !BINDING_FLAG;
            let property = *self.symbols.property_by_id(id).ok_or_else(|| {
                CompilerError::invalid_format(format!(
                    "unknown property id 0x{:02x} at offset {}",
                    id,
                    self.offset().saturating_sub(1)
                ))
            })?;
            let value = if raw & BINDING_FLAG != 0 {
                PropertyValue::Binding(self.varint()?)
            } else {
                PropertyValue::Literal(self.value(property.value_type)?)
            };
            properties.push(PropertyNode {
                name: property.name,
                id,
                value,
            });
        }

        let mut children = Vec::new();
        loop {
            let child_tag = self.tag()?;
            if child_tag == WIDGET_TERMINATOR {
                break;
            }
            children.push(self.widget(child_tag, depth + 1)?);
        }

        Ok(WidgetNode {
            widget: widget.name,
            tag,
            properties,
            children,
        })
    }

    fn value(&mut self, value_type: ValueType) -> Result<Value> {
        let value = match value_type {
            ValueType::Integer => Value::Integer(self.varint()?),
            ValueType::Number => Value::Number(self.float()?),
            ValueType::Enumeration => Value::Enumeration(self.tag()?),
            ValueType::String => {
                let bytes = self.cursor.read_string().map_err(|e| self.malformed("string", e))?;
                let text = String::from_utf8(bytes).map_err(|e| {
                    CompilerError::invalid_format(format!("string at offset {} is not UTF-8: {}", self.offset(), e))
                })?;
                Value::String(text)
            }
            ValueType::Boolean => match self.tag()? {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                other => {
                    return Err(CompilerError::invalid_format(format!(
                        "boolean byte {} at offset {}",
                        other,
                        self.offset() - 1
                    )))
                }
            },
            ValueType::Margins => {
                let mut margins = [0u32; 4];
                for slot in &mut margins {
                    *slot = self.varint()?;
                }
                Value::Margins(Margins(margins))
            }
            ValueType::SizeList => Value::SizeList(self.size_list()?),
            ValueType::Resource => Value::Resource(self.varint()?),
        };
        Ok(value)
    }

    fn size_list(&mut self) -> Result<Vec<SizeItem>> {
        let count = self.varint()? as usize;
        if count == 0 {
            return Err(CompilerError::invalid_format(format!(
                "empty size list at offset {}",
                self.offset()
            )));
        }

        let mut tags = Vec::new();
        for _ in 0..(count + 3) / 4 {
            let byte = self.tag()?;
            for j in 0..4 {
                if tags.len() < count {
                    tags.push((byte >> (2 * j)) & 0x3);
                }
            }
        }

        let mut items = Vec::with_capacity(tags.len());
        for tag in tags {
            let item = match tag {
                0 => SizeItem::Auto,
                1 => SizeItem::Expand,
                2 => SizeItem::Pixels(self.varint()?),
                _ => SizeItem::Percentage(self.float()?),
            };
            items.push(item);
        }
        Ok(items)
    }
}

/// Renders a decoded tree as indented layout-like text
pub fn render_tree(root: &WidgetNode) -> String {
    let mut text = String::new();
    render_widget(SymbolTables::global(), root, 0, &mut text);
    text
}

fn render_widget(symbols: &SymbolTables, node: &WidgetNode, indent: usize, text: &mut String) {
    let pad = "    ".repeat(indent);
    let _ = writeln!(text, "{}{} {{", pad, node.widget);
    for property in &node.properties {
        let _ = writeln!(
            text,
            "{}    {}: {};",
            pad,
            property.name,
            render_value(symbols, &property.value)
        );
    }
    for child in &node.children {
        render_widget(symbols, child, indent + 1, text);
    }
    let _ = writeln!(text, "{}}}", pad);
}

fn render_value(symbols: &SymbolTables, value: &PropertyValue) -> String {
    match value {
        PropertyValue::Binding(id) => format!("bind(#{})", id),
        PropertyValue::Literal(value) => match value {
            Value::Integer(v) => v.to_string(),
            Value::Number(v) => v.to_string(),
            Value::Enumeration(v) => symbols
                .enumeration_name(*v)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", v)),
            Value::String(s) => format!("{:?}", s),
            Value::Boolean(b) => b.to_string(),
            Value::Margins(m) => m.to_string(),
            Value::SizeList(items) => items
                .iter()
                .map(SizeItem::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Resource(id) => format!("resource(#{})", id),
        },
    }
}
