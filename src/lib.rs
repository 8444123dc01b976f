//! Widget Layout Compiler
//!
//! Compiles a brace-structured widget layout language into the compact
//! bytecode read by the widget runtime.
//!
//! # Basic Usage
//!
//! ```rust
//! use layoutc::{compile, Result};
//!
//! fn main() -> Result<()> {
//!     let mut bytecode: Vec<u8> = Vec::new();
//!     compile(r#"Panel { margin: 4; Button { text: "Ok"; } }"#, &mut bytecode)?;
//!     assert_eq!(bytecode.len(), 15);
//!     Ok(())
//! }
//! ```
//!
//! # Compilation Pipeline
//!
//! There is a single pass. The scanner hands tokens to the tree compiler,
//! which resolves names against the static registries and the host binding
//! tables and writes bytecode to the sink as it goes.
//!
//! 1. **Scanner** - `lexer::Lexer`, any `lexer::TokenSource` will do
//! 2. **Tree compiler** - `parser::TreeCompiler`, widget records and properties
//! 3. **Value encoder** - `encoder::ValueEncoder`, type-directed literal encoding

pub mod bindings;
pub mod cli;
pub mod codec;
pub mod dump;
pub mod encoder;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod types;

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::time::Instant;

pub use bindings::{BindingTable, Bindings};
pub use dump::{decode, render_tree, WidgetNode};
pub use encoder::{Value, ValueEncoder};
pub use error::{CompilerError, Result, SourcePos, SymbolKind};
pub use lexer::{Lexer, Token, TokenKind, TokenSource, TokenSourceExt};
pub use parser::{TreeCompiler, TreeStats};
pub use schema::SymbolTables;
pub use types::*;

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compilation options and settings
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Host resource and property tables
    pub bindings: Bindings,

    /// Log phase summaries at info level
    pub debug_mode: bool,

    /// Deepest widget nesting accepted, the root being depth 1
    pub max_nesting_depth: usize,

    /// Maximum source length in bytes (0 = no limit)
    pub max_source_size: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            bindings: Bindings::default(),
            debug_mode: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_source_size: 0,
        }
    }
}

/// Compilation statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationStats {
    /// Source size in bytes
    pub source_size: u64,

    /// Bytecode size in bytes
    pub output_size: u64,

    pub widget_count: usize,

    /// Literal properties, bindings excluded
    pub property_count: usize,

    pub binding_count: usize,

    /// Deepest nesting reached, the root being depth 1
    pub max_depth: usize,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Compiles one widget document into `sink` with empty binding tables
///
/// On error the sink may hold a partial, invalid stream.
pub fn compile<W: Write + ?Sized>(input: &str, sink: &mut W) -> Result<()> {
    compile_with_bindings(input, sink, &Bindings::default())
}

/// Compiles one widget document into `sink`, resolving `resource(..)` and
/// `bind(..)` names through the host tables
pub fn compile_with_bindings<W: Write + ?Sized>(input: &str, sink: &mut W, bindings: &Bindings) -> Result<()> {
    TreeCompiler::new(SymbolTables::global(), bindings).compile_document(&mut Lexer::new(input), sink)
}

/// Compile layout source to bytecode with default options
pub fn compile_source(source: &str) -> Result<Vec<u8>> {
    let (data, _stats) = compile_source_with_options(source, &CompilerOptions::default())?;
    Ok(data)
}

/// Compile layout source to bytecode with custom options
pub fn compile_source_with_options(source: &str, options: &CompilerOptions) -> Result<(Vec<u8>, CompilationStats)> {
    let start_time = Instant::now();

    if options.max_source_size > 0 && source.len() > options.max_source_size {
        return Err(CompilerError::LimitExceeded {
            limit_type: "source size in bytes".to_string(),
            limit: options.max_source_size,
        });
    }

    log::debug!("Source length: {} bytes", source.len());
    log::debug!(
        "Bindings: {} resources, {} properties",
        options.bindings.resources.len(),
        options.bindings.properties.len()
    );

    let mut lexer = Lexer::new(source);
    let mut compiler = TreeCompiler::new(SymbolTables::global(), &options.bindings)
        .with_max_depth(options.max_nesting_depth);

    let mut data = Vec::new();
    compiler.compile_document(&mut lexer, &mut data)?;

    let tree = compiler.stats();
    let stats = CompilationStats {
        source_size: source.len() as u64,
        output_size: data.len() as u64,
        widget_count: tree.widget_count,
        property_count: tree.property_count,
        binding_count: tree.binding_count,
        max_depth: tree.max_depth,
        compile_time_ms: start_time.elapsed().as_millis() as u64,
    };

    log::debug!(
        "Compiled {} widgets, {} properties, {} bindings",
        stats.widget_count,
        stats.property_count,
        stats.binding_count
    );

    Ok((data, stats))
}

/// Main compiler entry point with default options
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, &CompilerOptions::default())
}

/// Compile with custom options; the output file is only written on success
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: &CompilerOptions,
) -> Result<CompilationStats> {
    let start_time = Instant::now();

    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::info!("Compiling '{}' to '{}'...", input_path, output_path);
    }
    log::debug!("Compiler options: {:?}", options);

    let source = fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;

    let (data, mut stats) = compile_source_with_options(&source, options)?;
    fs::write(output_path, &data)?;
    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if options.debug_mode {
        log::info!("Compilation successful!");
        log::info!("Source size: {} bytes", stats.source_size);
        log::info!("Output size: {} bytes", stats.output_size);
        log::info!("Compile time: {}ms", stats.compile_time_ms);
    }
    log::debug!("Full stats: {:?}", stats);

    Ok(stats)
}
