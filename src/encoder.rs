//! Type-directed literal parsing and encoding
//!
//! Each property literal is parsed into a [`Value`] according to the declared
//! [`ValueType`] of its property, then written with the primitive codec.

use crate::bindings::BindingTable;
use crate::codec::WriteBytecodeExt;
use crate::error::{CompilerError, Result, SourcePos, SymbolKind};
use crate::lexer::{Token, TokenKind, TokenSource, TokenSourceExt};
use crate::schema::SymbolTables;
use crate::types::{pack_size_tags, Margins, SizeItem, ValueType};
use serde::Serialize;
use std::io::{self, Write};

/// A literal property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Integer(u32),
    Number(f32),
    Enumeration(u8),
    String(String),
    Boolean(bool),
    Margins(Margins),
    SizeList(Vec<SizeItem>),
    /// Resolved resource id
    Resource(u32),
}

impl Value {
    /// Writes the canonical encoding of the value
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Value::Integer(v) | Value::Resource(v) => out.write_varint(*v),
            Value::Number(v) => out.write_float32(*v),
            Value::Enumeration(v) => out.write_tag(*v),
            Value::String(text) => out.write_string(text.as_bytes()),
            Value::Boolean(b) => out.write_tag(u8::from(*b)),
            Value::Margins(margins) => {
                for v in margins.0 {
                    out.write_varint(v)?;
                }
                Ok(())
            }
            Value::SizeList(items) => {
                let count = u32::try_from(items.len()).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "size list too long")
                })?;
                out.write_varint(count)?;
                out.write_all(&pack_size_tags(items))?;
                for item in items {
                    match item {
                        SizeItem::Pixels(px) => out.write_varint(*px)?,
                        SizeItem::Percentage(fraction) => out.write_float32(*fraction)?,
                        SizeItem::Auto | SizeItem::Expand => {}
                    }
                }
                Ok(())
            }
        }
    }
}

/// Parses literals against the symbol registry and the resource table
pub struct ValueEncoder<'a> {
    symbols: &'a SymbolTables,
    resources: &'a BindingTable,
}

impl<'a> ValueEncoder<'a> {
    pub fn new(symbols: &'a SymbolTables, resources: &'a BindingTable) -> Self {
        Self { symbols, resources }
    }

    /// Parses one literal of `value_type` and writes it to `out`
    pub fn encode<T, W>(&self, value_type: ValueType, tokens: &mut T, out: &mut W) -> Result<Value>
    where
        T: TokenSource + ?Sized,
        W: Write + ?Sized,
    {
        let value = self.parse(value_type, tokens)?;
        value.write_to(out)?;
        Ok(value)
    }

    /// Parses one literal of `value_type`, including its terminating semicolon
    pub fn parse<T: TokenSource + ?Sized>(&self, value_type: ValueType, tokens: &mut T) -> Result<Value> {
        let value = match value_type {
            ValueType::Integer => {
                let value = lex_int(tokens)?;
                tokens.accept(TokenKind::Semicolon)?;
                Value::Integer(value)
            }
            ValueType::Number => {
                let token = tokens.expect_token()?;
                let value = match token.kind {
                    TokenKind::Integer | TokenKind::Number => parse_float(&token, &token.text)?,
                    _ => {
                        return Err(CompilerError::syntax(token.pos, "number or integer", token.text))
                    }
                };
                tokens.accept(TokenKind::Semicolon)?;
                Value::Number(value)
            }
            ValueType::Enumeration => {
                let token = tokens.accept(TokenKind::Identifier)?;
                let entry = self.symbols.enumeration(&token.text).ok_or_else(|| {
                    CompilerError::unknown_symbol(token.pos, SymbolKind::Enumeration, &token.text)
                })?;
                tokens.accept(TokenKind::Semicolon)?;
                Value::Enumeration(entry.value)
            }
            ValueType::String => {
                let token = tokens.accept(TokenKind::String)?;
                tokens.accept(TokenKind::Semicolon)?;
                Value::String(token.text)
            }
            ValueType::Boolean => {
                let token = tokens.accept(TokenKind::Identifier)?;
                let value = match token.text.as_str() {
                    "true" | "yes" => true,
                    "false" | "no" => false,
                    _ => {
                        return Err(CompilerError::invalid_value(
                            token.pos,
                            format!("invalid boolean value: {}", token.text),
                        ))
                    }
                };
                tokens.accept(TokenKind::Semicolon)?;
                Value::Boolean(value)
            }
            ValueType::Margins => Value::Margins(parse_margins(tokens)?),
            ValueType::SizeList => Value::SizeList(parse_size_list(tokens)?),
            ValueType::Resource => Value::Resource(self.parse_resource(tokens)?),
        };
        Ok(value)
    }

    fn parse_resource<T: TokenSource + ?Sized>(&self, tokens: &mut T) -> Result<u32> {
        let keyword = tokens.accept(TokenKind::Identifier)?;
        if keyword.text != "resource" {
            return Err(CompilerError::syntax(keyword.pos, "'resource'", keyword.text));
        }
        tokens.accept(TokenKind::OpenParens)?;
        let name = tokens.accept(TokenKind::String)?;
        tokens.accept(TokenKind::CloseParens)?;
        tokens.accept(TokenKind::Semicolon)?;

        self.resources
            .lookup(&name.text)
            .ok_or_else(|| CompilerError::unknown_symbol(name.pos, SymbolKind::Resource, name.text))
    }
}

/// Integer literal in the `u32` range
fn lex_int<T: TokenSource + ?Sized>(tokens: &mut T) -> Result<u32> {
    let token = tokens.accept(TokenKind::Integer)?;
    int_value(&token)
}

fn int_value(token: &Token) -> Result<u32> {
    token.text.parse::<u32>().map_err(|_| {
        CompilerError::invalid_value(
            token.pos,
            format!("integer {} is out of range 0..={}", token.text, u32::MAX),
        )
    })
}

fn parse_float(token: &Token, digits: &str) -> Result<f32> {
    digits.parse::<f32>().map_err(|e| {
        CompilerError::invalid_value(token.pos, format!("invalid number {}: {}", token.text, e))
    })
}

fn invalid_margin_count(pos: SourcePos) -> CompilerError {
    CompilerError::invalid_value(pos, "invalid count for margins. only 1, 2 or 4 values are allowed")
}

/// Reads 1, 2 or 4 comma separated integers. The 1 and 2 value forms end on
/// the semicolon met while looking for a comma; after a fourth value the
/// semicolon is required as a separate step.
fn parse_margins<T: TokenSource + ?Sized>(tokens: &mut T) -> Result<Margins> {
    if let Some(token) = tokens.peek() {
        if token.kind == TokenKind::Semicolon {
            return Err(invalid_margin_count(token.pos));
        }
    }

    let mut items = vec![lex_int(tokens)?];
    let mut end = tokens.position();
    while items.len() < 4 {
        let next = tokens.expect_token()?;
        match next.kind {
            TokenKind::Semicolon => {
                end = next.pos;
                break;
            }
            TokenKind::Comma => items.push(lex_int(tokens)?),
            _ => return Err(CompilerError::syntax(next.pos, "comma", next.text)),
        }
    }

    if items.len() == 4 {
        if let Some(token) = tokens.peek() {
            if token.kind == TokenKind::Comma {
                return Err(invalid_margin_count(token.pos));
            }
        }
        end = tokens.accept(TokenKind::Semicolon)?.pos;
    }

    Margins::broadcast(&items).ok_or_else(|| invalid_margin_count(end))
}

fn parse_size_item<T: TokenSource + ?Sized>(tokens: &mut T) -> Result<SizeItem> {
    let token = tokens.expect_token()?;
    match token.kind {
        TokenKind::Identifier => match token.text.as_str() {
            "auto" => Ok(SizeItem::Auto),
            "expand" => Ok(SizeItem::Expand),
            _ => Err(CompilerError::invalid_value(
                token.pos,
                format!("unexpected identifier {}. must be auto or expand", token.text),
            )),
        },
        TokenKind::Integer => Ok(SizeItem::Pixels(int_value(&token)?)),
        TokenKind::Percentage => {
            let digits = token.text.trim_end_matches('%');
            // 0.01 * x, not x / 100.0: the two encode differently
            Ok(SizeItem::Percentage(0.01 * parse_float(&token, digits)?))
        }
        _ => Err(CompilerError::syntax(
            token.pos,
            "'auto', 'expand', integer or percentage",
            token.text,
        )),
    }
}

fn parse_size_list<T: TokenSource + ?Sized>(tokens: &mut T) -> Result<Vec<SizeItem>> {
    let mut items = vec![parse_size_item(tokens)?];
    loop {
        let next = tokens.expect_token()?;
        match next.kind {
            TokenKind::Semicolon => break,
            TokenKind::Comma => items.push(parse_size_item(tokens)?),
            _ => return Err(CompilerError::syntax(next.pos, "comma", next.text)),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn encode(value_type: ValueType, source: &str) -> Result<Vec<u8>> {
        let resources: BindingTable = [("logo", 300u32)].into_iter().collect();
        let encoder = ValueEncoder::new(SymbolTables::global(), &resources);
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        encoder.encode(value_type, &mut lexer, &mut out)?;
        assert!(lexer.peek().is_none(), "literal left tokens behind: {}", source);
        Ok(out)
    }

    fn varints(values: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in values {
            out.write_varint(*v).unwrap();
        }
        out
    }

    #[test]
    fn test_integer() {
        assert_eq!(encode(ValueType::Integer, "300;").unwrap(), vec![0x82, 0x2C]);
        assert!(matches!(
            encode(ValueType::Integer, "-1;"),
            Err(CompilerError::InvalidValue { .. })
        ));
        assert!(matches!(
            encode(ValueType::Integer, "1.5;"),
            Err(CompilerError::Syntax { .. })
        ));
    }

    #[test]
    fn test_integer_requires_semicolon() {
        match encode(ValueType::Integer, "3 }") {
            Err(CompilerError::Syntax { expected, found, .. }) => {
                assert_eq!(expected, "semicolon");
                assert_eq!(found, "}");
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_number_accepts_integer_and_decimal() {
        assert_eq!(encode(ValueType::Number, "2;").unwrap(), 2.0f32.to_le_bytes().to_vec());
        assert_eq!(encode(ValueType::Number, "-0.5;").unwrap(), (-0.5f32).to_le_bytes().to_vec());
        assert!(matches!(
            encode(ValueType::Number, "\"2\";"),
            Err(CompilerError::Syntax { .. })
        ));
    }

    #[test]
    fn test_enumeration() {
        assert_eq!(encode(ValueType::Enumeration, "stretch;").unwrap(), vec![7]);
        match encode(ValueType::Enumeration, "sideways;") {
            Err(CompilerError::UnknownSymbol { kind, name, .. }) => {
                assert_eq!(kind, SymbolKind::Enumeration);
                assert_eq!(name, "sideways");
            }
            other => panic!("Expected unknown symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_string_is_verbatim() {
        assert_eq!(
            encode(ValueType::String, "\"Grüße\";").unwrap(),
            [&[7u8][..], "Grüße".as_bytes()].concat()
        );
    }

    #[test]
    fn test_boolean_aliases() {
        assert_eq!(encode(ValueType::Boolean, "yes;").unwrap(), vec![1]);
        assert_eq!(encode(ValueType::Boolean, "true;").unwrap(), vec![1]);
        assert_eq!(encode(ValueType::Boolean, "no;").unwrap(), vec![0]);
        assert_eq!(encode(ValueType::Boolean, "false;").unwrap(), vec![0]);
        assert!(matches!(
            encode(ValueType::Boolean, "maybe;"),
            Err(CompilerError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_margins_broadcast() {
        for v in [0u32, 4, 200, 70_000] {
            assert_eq!(
                encode(ValueType::Margins, &format!("{};", v)).unwrap(),
                varints(&[v, v, v, v])
            );
        }
        assert_eq!(encode(ValueType::Margins, "1, 200;").unwrap(), varints(&[1, 200, 1, 200]));
        assert_eq!(encode(ValueType::Margins, "1,2,3,4;").unwrap(), varints(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_margins_invalid_counts() {
        for source in [";", "1,2,3;", "1,2,3,4,5;"] {
            assert!(
                matches!(
                    encode(ValueType::Margins, source),
                    Err(CompilerError::InvalidValue { .. })
                ),
                "{} should be rejected",
                source
            );
        }
    }

    #[test]
    fn test_margins_four_values_need_their_own_semicolon() {
        match encode(ValueType::Margins, "1,2,3,4 }") {
            Err(CompilerError::Syntax { expected, .. }) => assert_eq!(expected, "semicolon"),
            other => panic!("Expected syntax error, got {:?}", other),
        }
        match encode(ValueType::Margins, "1 }") {
            Err(CompilerError::Syntax { expected, .. }) => assert_eq!(expected, "comma"),
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_size_list_layout() {
        let mut expected = vec![4, 0b11_10_01_00];
        expected.extend(varints(&[10]));
        expected.extend(0.25f32.to_le_bytes());
        assert_eq!(encode(ValueType::SizeList, "auto, expand, 10, 25%;").unwrap(), expected);
    }

    #[test]
    fn test_percentage_scales_by_one_hundredth() {
        for percent in [5u32, 9, 10, 15, 18, 20, 23, 27, 30, 33, 100] {
            let source = format!("{}%;", percent);
            let out = encode(ValueType::SizeList, &source).unwrap();
            assert_eq!(out[..2], [1, 0b11]);
            assert_eq!(
                out[2..],
                (0.01f32 * percent as f32).to_le_bytes(),
                "{}% encoded differently",
                percent
            );
        }

        let out = encode(ValueType::SizeList, "12.5%;").unwrap();
        assert_eq!(out[2..], (0.01f32 * 12.5f32).to_le_bytes());
    }

    #[test]
    fn test_size_list_spans_tag_bytes() {
        let out = encode(ValueType::SizeList, "expand, expand, expand, expand, 300;").unwrap();
        assert_eq!(out, vec![5, 0b01_01_01_01, 0b10, 0x82, 0x2C]);
    }

    #[test]
    fn test_size_list_rejects_other_identifiers() {
        assert!(matches!(
            encode(ValueType::SizeList, "auto, fill;"),
            Err(CompilerError::InvalidValue { .. })
        ));
        assert!(matches!(
            encode(ValueType::SizeList, ";"),
            Err(CompilerError::Syntax { .. })
        ));
    }

    #[test]
    fn test_resource() {
        assert_eq!(encode(ValueType::Resource, "resource(\"logo\");").unwrap(), vec![0x82, 0x2C]);
        match encode(ValueType::Resource, "resource(\"missing\");") {
            Err(CompilerError::UnknownSymbol { kind, name, .. }) => {
                assert_eq!(kind, SymbolKind::Resource);
                assert_eq!(name, "missing");
            }
            other => panic!("Expected unknown symbol, got {:?}", other),
        }
        assert!(matches!(
            encode(ValueType::Resource, "image(\"logo\");"),
            Err(CompilerError::Syntax { .. })
        ));
    }

    #[test]
    fn test_end_of_input_inside_literal() {
        assert!(matches!(
            encode(ValueType::SizeList, "auto,"),
            Err(CompilerError::UnexpectedEndOfInput { .. })
        ));
    }
}
