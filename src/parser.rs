//! Recursive descent compiler for widget trees
//!
//! Widget bodies are translated straight into bytecode while they are parsed;
//! no tree is kept in memory. Each widget record is
//! `[tag][property*][property terminator][child*][widget terminator]`.

use crate::bindings::Bindings;
use crate::codec::WriteBytecodeExt;
use crate::encoder::ValueEncoder;
use crate::error::{CompilerError, Result, SymbolKind};
use crate::lexer::{Token, TokenKind, TokenSource, TokenSourceExt};
use crate::schema::{PropertyEntry, SymbolTables};
use crate::types::{BINDING_FLAG, DEFAULT_MAX_NESTING_DEPTH, PROPERTY_TERMINATOR, WIDGET_TERMINATOR};
use serde::Serialize;
use std::io::Write;

/// Counters collected while compiling one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub widget_count: usize,
    pub property_count: usize,
    pub binding_count: usize,
    pub max_depth: usize,
}

pub struct TreeCompiler<'a> {
    symbols: &'a SymbolTables,
    bindings: &'a Bindings,
    max_depth: usize,
    stats: TreeStats,
}

impl<'a> TreeCompiler<'a> {
    pub fn new(symbols: &'a SymbolTables, bindings: &'a Bindings) -> Self {
        Self {
            symbols,
            bindings,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            stats: TreeStats::default(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    /// Compiles one widget document; nothing but end of input may follow it
    pub fn compile_document<T, W>(&mut self, tokens: &mut T, out: &mut W) -> Result<()>
    where
        T: TokenSource + ?Sized,
        W: Write + ?Sized,
    {
        let name = tokens.accept(TokenKind::Identifier)?;
        self.compile_widget(&name, tokens, out, 1)?;

        if let Some(extra) = tokens.peek() {
            return Err(CompilerError::syntax(extra.pos, "end of input", extra.text.clone()));
        }
        Ok(())
    }

    /// Compiles the body of the widget named by `name`, starting at its `{`
    fn compile_widget<T, W>(&mut self, name: &Token, tokens: &mut T, out: &mut W, depth: usize) -> Result<()>
    where
        T: TokenSource + ?Sized,
        W: Write + ?Sized,
    {
        if depth > self.max_depth {
            return Err(CompilerError::LimitExceeded {
                limit_type: "widget nesting depth".to_string(),
                limit: self.max_depth,
            });
        }

        tokens.accept(TokenKind::OpenBrace)?;

        let widget = self
            .symbols
            .widget(&name.text)
            .ok_or_else(|| CompilerError::unknown_symbol(name.pos, SymbolKind::Widget, &name.text))?;
        out.write_tag(widget.tag)?;

        log::trace!("widget {} (tag {}) at {}, depth {}", widget.name, widget.tag, name.pos, depth);
        self.stats.widget_count += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let mut has_children = false;
        loop {
            let token = tokens.expect_token()?;
            match token.kind {
                TokenKind::CloseBrace => break,
                TokenKind::Identifier => {
                    if let Some(property) = self.symbols.property(&token.text).copied() {
                        if has_children {
                            return Err(CompilerError::PropertyAfterChild {
                                pos: token.pos,
                                property: token.text,
                            });
                        }
                        self.compile_property(&property, &token, tokens, out)?;
                    } else if self.symbols.widget(&token.text).is_some() {
                        if !has_children {
                            out.write_tag(PROPERTY_TERMINATOR)?;
                            has_children = true;
                        }
                        self.compile_widget(&token, tokens, out, depth + 1)?;
                    } else {
                        let kind = unknown_member_kind(tokens);
                        return Err(CompilerError::unknown_symbol(token.pos, kind, token.text));
                    }
                }
                _ => {
                    return Err(CompilerError::syntax(
                        token.pos,
                        "property, child widget or closing brace",
                        token.text,
                    ))
                }
            }
        }

        if !has_children {
            out.write_tag(PROPERTY_TERMINATOR)?;
        }
        out.write_tag(WIDGET_TERMINATOR)?;
        Ok(())
    }

    /// Compiles `name: literal` or `name: bind("source");` after the name
    fn compile_property<T, W>(
        &mut self,
        property: &PropertyEntry,
        name: &Token,
        tokens: &mut T,
        out: &mut W,
    ) -> Result<()>
    where
        T: TokenSource + ?Sized,
        W: Write + ?Sized,
    {
        tokens.accept(TokenKind::Colon)?;

        let is_binding = tokens.peek().map_or(false, |t| t.is_identifier("bind"));
        if is_binding {
            out.write_tag(property.id | BINDING_FLAG)?;

            tokens.accept(TokenKind::Identifier)?;
            tokens.accept(TokenKind::OpenParens)?;
            let source = tokens.accept(TokenKind::String)?;
            tokens.accept(TokenKind::CloseParens)?;
            tokens.accept(TokenKind::Semicolon)?;

            let id = self.bindings.properties.lookup(&source.text).ok_or_else(|| {
                CompilerError::unknown_symbol(source.pos, SymbolKind::PropertyBinding, &source.text)
            })?;
            out.write_varint(id)?;

            log::trace!("property {} at {} bound to '{}' ({})", property.name, name.pos, source.text, id);
            self.stats.binding_count += 1;
        } else {
            out.write_tag(property.id)?;

            let encoder = ValueEncoder::new(self.symbols, &self.bindings.resources);
            let value = encoder.encode(property.value_type, tokens, out)?;

            log::trace!("property {} at {} = {:?}", property.name, name.pos, value);
            self.stats.property_count += 1;
        }
        Ok(())
    }
}

/// Names the kind of an unregistered body identifier by the token after it
fn unknown_member_kind<T: TokenSource + ?Sized>(tokens: &mut T) -> SymbolKind {
    match tokens.peek().map(|token| token.kind) {
        Some(TokenKind::Colon) => SymbolKind::Property,
        Some(TokenKind::OpenBrace) => SymbolKind::Widget,
        _ => SymbolKind::Member,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingTable;
    use crate::error::SourcePos;
    use crate::lexer::Lexer;
    use std::collections::VecDeque;

    fn tag(widget: &str) -> u8 {
        SymbolTables::global().widget(widget).unwrap().tag
    }

    fn id(property: &str) -> u8 {
        SymbolTables::global().property(property).unwrap().id
    }

    fn host_bindings() -> Bindings {
        Bindings::new(
            [("logo", 5u32)].into_iter().collect(),
            [("title", 3u32), ("items", 200u32)].into_iter().collect::<BindingTable>(),
        )
    }

    fn compile(source: &str) -> Result<Vec<u8>> {
        let bindings = host_bindings();
        let mut compiler = TreeCompiler::new(SymbolTables::global(), &bindings);
        let mut out = Vec::new();
        compiler.compile_document(&mut Lexer::new(source), &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_end_to_end_example() {
        let out = compile(r#"Panel { margin: 4; Button { text: "Ok"; } }"#).unwrap();
        assert_eq!(
            out,
            vec![
                tag("Panel"),
                id("margin"),
                4,
                4,
                4,
                4,
                PROPERTY_TERMINATOR,
                tag("Button"),
                id("text"),
                2,
                b'O',
                b'k',
                PROPERTY_TERMINATOR,
                WIDGET_TERMINATOR,
                WIDGET_TERMINATOR,
            ]
        );
    }

    #[test]
    fn test_empty_widget_still_has_both_terminators() {
        assert_eq!(
            compile("Spacer { }").unwrap(),
            vec![tag("Spacer"), PROPERTY_TERMINATOR, WIDGET_TERMINATOR]
        );
    }

    #[test]
    fn test_property_terminator_emitted_once_for_many_children() {
        let out = compile("StackLayout { Label { } Label { } Label { } }").unwrap();
        let label = [tag("Label"), PROPERTY_TERMINATOR, WIDGET_TERMINATOR];
        let mut expected = vec![tag("StackLayout"), PROPERTY_TERMINATOR];
        for _ in 0..3 {
            expected.extend_from_slice(&label);
        }
        expected.push(WIDGET_TERMINATOR);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_binding_sets_high_bit() {
        let out = compile(r#"Label { text: bind("items"); }"#).unwrap();
        assert_eq!(
            out,
            vec![tag("Label"), id("text") | BINDING_FLAG, 0x81, 0x48, PROPERTY_TERMINATOR, WIDGET_TERMINATOR]
        );
    }

    #[test]
    fn test_binding_ignores_declared_type() {
        // margins would need integers, a binding never parses a literal
        let out = compile(r#"Panel { margin: bind("title"); }"#).unwrap();
        assert_eq!(out[1], id("margin") | BINDING_FLAG);
        assert_eq!(out[2], 3);
    }

    #[test]
    fn test_unknown_binding() {
        match compile(r#"Label { text: bind("nope"); }"#) {
            Err(CompilerError::UnknownSymbol { kind, name, .. }) => {
                assert_eq!(kind, SymbolKind::PropertyBinding);
                assert_eq!(name, "nope");
            }
            other => panic!("Expected unknown symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_resource_literal_uses_host_table() {
        let out = compile(r#"Picture { image: resource("logo"); }"#).unwrap();
        assert_eq!(out, vec![tag("Picture"), id("image"), 5, PROPERTY_TERMINATOR, WIDGET_TERMINATOR]);
    }

    #[test]
    fn test_property_after_child() {
        match compile("Panel { Button { } margin: 4; }") {
            Err(CompilerError::PropertyAfterChild { property, pos }) => {
                assert_eq!(property, "margin");
                assert_eq!(pos, SourcePos::new(1, 20));
            }
            other => panic!("Expected property after child, got {:?}", other),
        }
    }

    #[test]
    fn test_property_after_child_in_nested_body() {
        // the ordering rule is per body, a child's own properties are fine
        assert!(compile("Panel { Button { text: \"a\"; } Button { text: \"b\"; } }").is_ok());
        assert!(matches!(
            compile("Panel { Panel { Label { } enabled: yes; } }"),
            Err(CompilerError::PropertyAfterChild { .. })
        ));
    }

    #[test]
    fn test_unknown_root_widget() {
        match compile("Window { }") {
            Err(CompilerError::UnknownSymbol { kind, name, .. }) => {
                assert_eq!(kind, SymbolKind::Widget);
                assert_eq!(name, "Window");
            }
            other => panic!("Expected unknown widget, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_identifier_in_body() {
        let cases = [
            ("Panel { colour: 3; }", SymbolKind::Property, "colour"),
            ("Panel { Buton { } }", SymbolKind::Widget, "Buton"),
            ("Panel { colour 3; }", SymbolKind::Member, "colour"),
            ("Panel { colour", SymbolKind::Member, "colour"),
        ];
        for (source, expected_kind, expected_name) in cases {
            match compile(source) {
                Err(CompilerError::UnknownSymbol { kind, name, .. }) => {
                    assert_eq!(kind, expected_kind, "for {}", source);
                    assert_eq!(name, expected_name);
                }
                other => panic!("Expected unknown symbol for {}, got {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_name_registered_twice_resolves_as_property() {
        use crate::schema::{EnumEntry, PropertyEntry, WidgetEntry};
        use crate::types::ValueType;

        let widgets = [
            WidgetEntry { name: "Panel", tag: 1 },
            WidgetEntry { name: "Label", tag: 2 },
        ];
        let properties = [PropertyEntry {
            name: "Label",
            id: 9,
            value_type: ValueType::String,
        }];
        let enumerations: [EnumEntry; 0] = [];
        let symbols = SymbolTables::from_schema(&widgets, &properties, &enumerations);

        let bindings = Bindings::default();
        let mut out: Vec<u8> = Vec::new();
        TreeCompiler::new(&symbols, &bindings)
            .compile_document(&mut Lexer::new(r#"Panel { Label: "x"; }"#), &mut out)
            .unwrap();
        assert_eq!(out, vec![1, 9, 1, b'x', PROPERTY_TERMINATOR, WIDGET_TERMINATOR]);

        // as a property it takes a value, not a body
        let result = TreeCompiler::new(&symbols, &bindings)
            .compile_document(&mut Lexer::new("Panel { Label { } }"), &mut Vec::<u8>::new());
        assert!(matches!(result, Err(CompilerError::Syntax { .. })));
    }

    #[test]
    fn test_unexpected_token_in_body() {
        assert!(matches!(compile("Panel { ; }"), Err(CompilerError::Syntax { .. })));
        assert!(matches!(compile("Panel { \"text\" }"), Err(CompilerError::Syntax { .. })));
    }

    #[test]
    fn test_missing_closing_brace() {
        assert!(matches!(
            compile("Panel { Button { }"),
            Err(CompilerError::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        match compile("Panel { } Panel { }") {
            Err(CompilerError::Syntax { expected, found, .. }) => {
                assert_eq!(expected, "end of input");
                assert_eq!(found, "Panel");
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let bindings = Bindings::default();
        let mut compiler = TreeCompiler::new(SymbolTables::global(), &bindings).with_max_depth(2);
        let mut out: Vec<u8> = Vec::new();
        assert!(compiler
            .compile_document(&mut Lexer::new("Panel { Panel { } }"), &mut out)
            .is_ok());

        let mut compiler = TreeCompiler::new(SymbolTables::global(), &bindings).with_max_depth(2);
        let result = compiler.compile_document(&mut Lexer::new("Panel { Panel { Panel { } } }"), &mut out);
        assert!(matches!(result, Err(CompilerError::LimitExceeded { limit: 2, .. })));
    }

    #[test]
    fn test_stats() {
        let bindings = host_bindings();
        let mut compiler = TreeCompiler::new(SymbolTables::global(), &bindings);
        let source = r#"
            GridLayout {
                columns: auto, 50%;
                Label { text: bind("title"); }
                Button { text: "Go"; enabled: no; }
            }
        "#;
        compiler
            .compile_document(&mut Lexer::new(source), &mut Vec::<u8>::new())
            .unwrap();
        assert_eq!(
            compiler.stats(),
            &TreeStats {
                widget_count: 3,
                property_count: 3,
                binding_count: 1,
                max_depth: 2,
            }
        );
    }

    /// Token source fed from a prepared list instead of the lexer
    struct QueuedTokens {
        tokens: VecDeque<Token>,
    }

    impl TokenSource for QueuedTokens {
        fn peek(&mut self) -> Option<&Token> {
            self.tokens.front()
        }

        fn lex(&mut self) -> Option<Token> {
            self.tokens.pop_front()
        }

        fn position(&self) -> SourcePos {
            self.tokens.front().map(|t| t.pos).unwrap_or_default()
        }
    }

    #[test]
    fn test_any_token_source_can_drive_the_compiler() {
        let pos = SourcePos::start();
        let tokens = [
            (TokenKind::Identifier, "CheckBox"),
            (TokenKind::OpenBrace, "{"),
            (TokenKind::Identifier, "isChecked"),
            (TokenKind::Colon, ":"),
            (TokenKind::Identifier, "yes"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::CloseBrace, "}"),
        ];
        let mut source = QueuedTokens {
            tokens: tokens.iter().map(|(kind, text)| Token::new(*kind, *text, pos)).collect(),
        };

        let bindings = Bindings::default();
        let mut out = Vec::new();
        TreeCompiler::new(SymbolTables::global(), &bindings)
            .compile_document(&mut source, &mut out)
            .unwrap();
        assert_eq!(
            out,
            vec![tag("CheckBox"), id("isChecked"), 1, PROPERTY_TERMINATOR, WIDGET_TERMINATOR]
        );
    }
}
