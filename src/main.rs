//! Widget Layout Compiler Binary

use layoutc::cli::LayoutCli;
use std::process;

fn main() {
    let mut cli = LayoutCli::new();

    if let Err(e) = cli.run() {
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}
