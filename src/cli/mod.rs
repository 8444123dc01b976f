// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::bindings::Bindings;
use crate::error::Result;
use crate::CompilerOptions;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpFormat {
    Text,
    Json,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Text,
    Json,
}

pub struct LayoutCli {
    config: config::ConfigFile,
}

impl Default for LayoutCli {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let matches = self.build_cli().get_matches();

        self.setup_logging(matches.get_count("verbose"));

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        match matches.subcommand() {
            Some(("compile", sub_matches)) => handlers::handle_compile_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches),
            Some(("dump", sub_matches)) => handlers::handle_dump_command(sub_matches),
            Some(("symbols", sub_matches)) => handlers::handle_symbols_command(sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        }
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.toml or .json)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("compile")
                    .about("Compile a layout file to bytecode")
                    .arg(Arg::new("input").help("Input layout file").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output bytecode file"))
                    .arg(bindings_arg())
                    .arg(Arg::new("resource").short('r').long("resource").value_name("NAME=ID").help("Define a resource id").action(ArgAction::Append))
                    .arg(Arg::new("property").short('P').long("property").value_name("NAME=ID").help("Define a bindable property id").action(ArgAction::Append))
                    .arg(debug_arg())
                    .arg(Arg::new("stats").long("stats").help("Show detailed compilation statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("hex").long("hex").help("Print the bytecode as hex").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for file changes and recompile").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Check layout files for errors without writing output")
                    .arg(Arg::new("input").help("Input layout file or directory").required(true).index(1))
                    .arg(Arg::new("recursive").short('r').long("recursive").help("Check all layout files in directory recursively").action(ArgAction::SetTrue))
                    .arg(bindings_arg())
                    .arg(debug_arg()),
            )
            .subcommand(
                Command::new("dump")
                    .about("Decode a bytecode file")
                    .arg(Arg::new("input").help("Input bytecode file").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write the dump to a file"))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(DumpFormat)).default_value("text").help("Dump format")),
            )
            .subcommand(
                Command::new("symbols")
                    .about("List the registered widgets, properties and enumeration values")
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(ListFormat)).default_value("text").help("Listing format")),
            )
    }

    fn setup_logging(&self, verbose_count: u8) {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
    }

    /// Builds options from the config file, then applies command-line flags
    /// on top
    pub fn build_compiler_options(&self, matches: &ArgMatches) -> Result<CompilerOptions> {
        let mut options = CompilerOptions::default();

        let bindings_path = matches
            .get_one::<String>("bindings")
            .or(self.config.bindings.as_ref());
        if let Some(path) = bindings_path {
            options.bindings = Bindings::from_file(path)?;
        }

        // flag definitions override entries of the same name from the file
        let mut defined = Bindings::default();
        if let Ok(Some(definitions)) = matches.try_get_many::<String>("resource") {
            for definition in definitions {
                defined.resources.insert_definition(definition)?;
            }
        }
        if let Ok(Some(definitions)) = matches.try_get_many::<String>("property") {
            for definition in definitions {
                defined.properties.insert_definition(definition)?;
            }
        }
        options.bindings.merge(defined);

        options.debug_mode = matches.get_flag("debug");
        if let Some(depth) = self.config.max_nesting_depth {
            options.max_nesting_depth = depth;
        }
        if let Some(max_size) = self.config.max_source_size {
            options.max_source_size = max_size;
        }
        Ok(options)
    }

    /// `-o` wins, then the configured output directory, then the input path
    /// with a `.bin` extension
    pub fn output_path_for(&self, input_path: &str, explicit: Option<&String>) -> PathBuf {
        if let Some(path) = explicit {
            return PathBuf::from(path);
        }
        let default = Path::new(input_path).with_extension("bin");
        match (&self.config.output_directory, default.file_name()) {
            (Some(dir), Some(file_name)) => Path::new(dir).join(file_name),
            _ => default,
        }
    }
}

fn bindings_arg() -> Arg {
    Arg::new("bindings")
        .short('b')
        .long("bindings")
        .value_name("FILE")
        .help("Resource and property bindings (.toml or .json)")
}

fn debug_arg() -> Arg {
    Arg::new("debug")
        .short('d')
        .long("debug")
        .help("Log compilation phases")
        .action(ArgAction::SetTrue)
}
