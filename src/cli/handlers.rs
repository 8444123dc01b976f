// FILE: src/cli/handlers.rs
use super::{DumpFormat, LayoutCli, ListFormat};
use crate::schema::{EnumEntry, PropertyEntry, WidgetEntry, ENUMERATIONS, PROPERTIES, WIDGETS};
use crate::{
    compile_file_with_options, compile_source_with_options, decode, render_tree, CompilationStats, CompilerError,
    CompilerOptions, Result,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;

/// Extension of layout sources picked up by `check --recursive`
const LAYOUT_EXTENSION: &str = "layout";

fn required<'a>(matches: &'a clap::ArgMatches, id: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| CompilerError::invalid_format(format!("missing argument <{}>", id)))
}

fn watch_error(context: &str, e: notify::Error) -> CompilerError {
    CompilerError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, e),
    ))
}

// --- COMPILE ---
pub fn handle_compile_command(cli: &LayoutCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let output_path = cli.output_path_for(input_path, matches.get_one::<String>("output"));
    let output_path = output_path.to_string_lossy().into_owned();

    if let Some(parent) = Path::new(&output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let options = cli.build_compiler_options(matches)?;

    if matches.get_flag("watch") {
        watch_and_compile(input_path, &output_path, &options)
    } else {
        compile_single_file(input_path, &output_path, &options, matches)
    }
}

fn compile_single_file(
    input_path: &str,
    output_path: &str,
    options: &CompilerOptions,
    matches: &clap::ArgMatches,
) -> Result<()> {
    println!("🔨 Compiling {} -> {}", input_path, output_path);

    let stats = compile_file_with_options(input_path, output_path, options)?;

    println!("✅ Compilation successful!");
    println!("   Output: {} bytes", stats.output_size);
    println!("   Time: {}ms", stats.compile_time_ms);

    if matches.get_flag("stats") {
        print_detailed_stats(&stats);
    }

    if matches.get_flag("hex") {
        let data = fs::read(output_path)?;
        print!("{}", hex_lines(&data));
    }

    Ok(())
}

fn watch_and_compile(input_path: &str, output_path: &str, options: &CompilerOptions) -> Result<()> {
    println!("👀 Watching {} for changes...", input_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| watch_error("Failed to create file watcher", e))?;

    watcher
        .watch(Path::new(input_path), RecursiveMode::NonRecursive)
        .map_err(|e| watch_error("Failed to watch file", e))?;

    if let Err(e) = compile_file_with_options(input_path, output_path, options) {
        eprintln!("❌ Initial compilation failed: {}", e);
    } else {
        println!("✅ Initial compilation successful");
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    continue;
                }
                println!("🔄 File changed, recompiling...");
                match compile_file_with_options(input_path, output_path, options) {
                    Ok(stats) => {
                        println!(
                            "✅ Recompiled successfully ({} bytes, {}ms)",
                            stats.output_size, stats.compile_time_ms
                        );
                    }
                    Err(e) => eprintln!("❌ Compilation failed: {}", e),
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

// --- CHECK ---
pub fn handle_check_command(cli: &LayoutCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let recursive = matches.get_flag("recursive");
    let options = cli.build_compiler_options(matches)?;

    if recursive && Path::new(input_path).is_dir() {
        check_directory_recursive(input_path, &options)
    } else {
        check_single_file(Path::new(input_path), &options)
    }
}

fn check_file(path: &Path, options: &CompilerOptions) -> Result<CompilationStats> {
    let source = fs::read_to_string(path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", path.display(), e),
    })?;
    let (_, stats) = compile_source_with_options(&source, options)?;
    Ok(stats)
}

fn check_single_file(path: &Path, options: &CompilerOptions) -> Result<()> {
    println!("🔍 Checking {}", path.display());
    match check_file(path, options) {
        Ok(stats) => {
            println!(
                "✅ {} - No issues found ({} widgets)",
                path.display(),
                stats.widget_count
            );
            Ok(())
        }
        Err(e) => {
            println!("❌ {} - {}", path.display(), e);
            Err(e)
        }
    }
}

fn check_directory_recursive(dir_path: &str, options: &CompilerOptions) -> Result<()> {
    let mut total_files = 0;
    let mut error_files = 0;

    for entry in walkdir::WalkDir::new(dir_path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        let is_layout = entry.path().extension().map_or(false, |ext| ext == LAYOUT_EXTENSION);
        if entry.file_type().is_file() && is_layout {
            total_files += 1;
            if check_single_file(entry.path(), options).is_err() {
                error_files += 1;
            }
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", total_files);
    println!("   Files with errors: {}", error_files);
    if total_files > 0 {
        println!(
            "   Success rate: {:.1}%",
            (total_files - error_files) as f64 / total_files as f64 * 100.0
        );
    }

    if error_files > 0 {
        Err(CompilerError::invalid_format(format!("{} files have errors", error_files)))
    } else {
        Ok(())
    }
}

// --- DUMP ---
pub fn handle_dump_command(matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let format = matches.get_one::<DumpFormat>("format").copied().unwrap_or(DumpFormat::Text);

    let data = fs::read(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;
    let dump = render_dump(&data, format)?;

    if let Some(output_file) = matches.get_one::<String>("output") {
        fs::write(output_file, dump)?;
        println!("✅ Dump saved to {}", output_file);
    } else {
        print!("{}", dump);
    }
    Ok(())
}

fn render_dump(data: &[u8], format: DumpFormat) -> Result<String> {
    match format {
        DumpFormat::Hex => Ok(hex_lines(data)),
        DumpFormat::Text => Ok(render_tree(&decode(data)?)),
        DumpFormat::Json => to_json(&decode(data)?),
    }
}

/// Offset-prefixed hex listing, 16 bytes per line
fn hex_lines(data: &[u8]) -> String {
    let mut text = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| hex::encode([*b])).collect();
        let _ = writeln!(text, "{:08x}  {}", line * 16, bytes.join(" "));
    }
    text
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| CompilerError::invalid_format(format!("JSON serialization error: {}", e)))?;
    json.push('\n');
    Ok(json)
}

// --- SYMBOLS ---
#[derive(Serialize)]
struct SymbolListing {
    widgets: &'static [WidgetEntry],
    properties: &'static [PropertyEntry],
    enumerations: &'static [EnumEntry],
}

pub fn handle_symbols_command(matches: &clap::ArgMatches) -> Result<()> {
    let format = matches.get_one::<ListFormat>("format").copied().unwrap_or(ListFormat::Text);
    print!("{}", render_symbols(format)?);
    Ok(())
}

fn render_symbols(format: ListFormat) -> Result<String> {
    if format == ListFormat::Json {
        return to_json(&SymbolListing {
            widgets: WIDGETS,
            properties: PROPERTIES,
            enumerations: ENUMERATIONS,
        });
    }

    let mut text = String::new();
    let _ = writeln!(text, "Widgets:");
    for widget in WIDGETS {
        let _ = writeln!(text, "   {:>3}  {}", widget.tag, widget.name);
    }
    let _ = writeln!(text, "\nProperties:");
    for property in PROPERTIES {
        let _ = writeln!(
            text,
            "   {:>3}  {:<22} {}",
            property.id, property.name, property.value_type
        );
    }
    let _ = writeln!(text, "\nEnumeration values:");
    for entry in ENUMERATIONS {
        let _ = writeln!(text, "   {:>3}  {}", entry.value, entry.name);
    }
    Ok(text)
}

// --- HELPERS ---
fn print_detailed_stats(stats: &CompilationStats) {
    println!("\n📊 Detailed Compilation Statistics:");
    println!("   Source size: {} bytes", stats.source_size);
    println!("   Output size: {} bytes", stats.output_size);
    println!("   Compile time: {}ms", stats.compile_time_ms);
    println!("\n   Tree breakdown:");
    println!("     Widgets: {}", stats.widget_count);
    println!("     Properties: {}", stats.property_count);
    println!("     Bindings: {}", stats.binding_count);
    println!("     Max depth: {}", stats.max_depth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_source;
    use tempfile::TempDir;

    #[test]
    fn test_hex_lines() {
        let data: Vec<u8> = (0u8..18).collect();
        assert_eq!(
            hex_lines(&data),
            "00000000  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f\n00000010  10 11\n"
        );
        assert_eq!(hex_lines(&[]), "");
    }

    #[test]
    fn test_render_dump_formats() {
        let data = compile_source(r#"Label { text: "Hi"; }"#).unwrap();

        let text = render_dump(&data, DumpFormat::Text).unwrap();
        assert!(text.starts_with("Label {\n"));

        let json: serde_json::Value = serde_json::from_str(&render_dump(&data, DumpFormat::Json).unwrap()).unwrap();
        assert_eq!(json["widget"], "Label");
        assert_eq!(json["properties"][0]["name"], "text");

        let hex = render_dump(&[1, 2, 0], DumpFormat::Hex).unwrap();
        assert_eq!(hex, "00000000  01 02 00\n");

        assert!(render_dump(&[0xFF], DumpFormat::Text).is_err());
    }

    #[test]
    fn test_render_symbols() {
        let text = render_symbols(ListFormat::Text).unwrap();
        assert!(text.contains("Button"));
        assert!(text.contains("size-list"));

        let json: serde_json::Value = serde_json::from_str(&render_symbols(ListFormat::Json).unwrap()).unwrap();
        assert_eq!(json["widgets"].as_array().unwrap().len(), WIDGETS.len());
        assert_eq!(json["properties"][0]["value_type"], "enumeration");
    }

    #[test]
    fn test_check_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("dialogs");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("main.layout"), "Panel { }").unwrap();
        fs::write(nested.join("about.layout"), r#"Label { text: "About"; }"#).unwrap();
        fs::write(nested.join("notes.txt"), "not a layout").unwrap();

        let options = CompilerOptions::default();
        assert!(check_directory_recursive(temp_dir.path().to_str().unwrap(), &options).is_ok());

        fs::write(nested.join("broken.layout"), "Label { text: 5; }").unwrap();
        assert!(check_directory_recursive(temp_dir.path().to_str().unwrap(), &options).is_err());
    }
}
