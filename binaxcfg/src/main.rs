//! axcfg command-line tool for validating and formatting dashboard
//! configuration documents.
//!
//! Usage: axcfg [OPTIONS] [FILE|DIR]
//!
//! Options:
//!   --check                Validate and print diagnostics (exit 1 on any error)
//!   --fmt                  Print the formatted document [default]
//!   -w, --write            Write formatted output back to the file
//!   --json                 Print diagnostics or edits as JSON
//!   --catalog <FILE>       Setting descriptors (YAML or JSON)
//!   --config <FILE>        Configuration file [default: ./axcfg.toml if present]
//!   --tab-size <N>         Indentation width [default: 2]
//!   --use-tabs             Indent with tabs
//!   -h, --help             Print help
//!   -V, --version          Print version

use libaxcfg::{
    apply_edits, format, Diagnostic, FormattingOptions, Severity, SettingsCatalog, Validator,
};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod catalog;
mod config;
mod error;

use config::Config;

/// Extension of documents picked up in directory mode.
const DOCUMENT_EXTENSION: &str = "config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check,
    Format,
}

/// Everything a single document run needs.
struct Run<'a> {
    mode: Mode,
    validator: Validator<'a>,
    options: FormattingOptions,
    write_back: bool,
    json: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut mode: Option<Mode> = None;
    let mut write_back = false;
    let mut json = false;
    let mut catalog_path: Option<&str> = None;
    let mut config_path: Option<&str> = None;
    let mut tab_size: Option<u32> = None;
    let mut use_tabs = false;
    let mut input_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-V" | "--version" => {
                println!("axcfg {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--check" => {
                set_mode(&mut mode, Mode::Check);
            }
            "--fmt" => {
                set_mode(&mut mode, Mode::Format);
            }
            "-w" | "--write" => {
                write_back = true;
            }
            "--json" => {
                json = true;
            }
            "--catalog" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --catalog requires a file argument");
                    process::exit(1);
                }
                catalog_path = Some(&args[i]);
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file argument");
                    process::exit(1);
                }
                config_path = Some(&args[i]);
            }
            "--tab-size" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --tab-size requires a number");
                    process::exit(1);
                }
                match args[i].parse::<u32>() {
                    Ok(n) if n > 0 => tab_size = Some(n),
                    _ => {
                        eprintln!("Error: Invalid tab size: {}", args[i]);
                        process::exit(1);
                    }
                }
            }
            "--use-tabs" => {
                use_tabs = true;
            }
            "-" => {
                // Explicit stdin
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                process::exit(1);
            }
            _ => {
                if input_path.is_some() {
                    eprintln!("Error: Multiple input paths not supported");
                    process::exit(1);
                }
                input_path = Some(&args[i]);
            }
        }
        i += 1;
    }

    let mode = mode.unwrap_or(Mode::Format);
    if write_back && mode == Mode::Check {
        eprintln!("Error: --write cannot be used with --check");
        process::exit(1);
    }
    if write_back && json {
        eprintln!("Error: --write and --json are mutually exclusive");
        process::exit(1);
    }

    let config = match Config::discover(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // The flag wins over the configuration file.
    let catalog_file = catalog_path
        .map(Path::new)
        .or(config.catalog.as_deref());
    let loaded = match catalog_file {
        Some(path) => match catalog::load(path) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };
    let catalog = loaded.as_ref().unwrap_or_else(|| SettingsCatalog::builtin());
    debug!(settings = catalog.len(), "using settings catalog");

    let run = Run {
        mode,
        validator: Validator::new(catalog),
        options: config.formatting_options(tab_size, use_tabs),
        write_back,
        json,
    };

    if let Some(path) = input_path {
        if Path::new(path).is_dir() {
            process_directory(path, &run);
            return;
        }
    }

    let input = match input_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading stdin: {}", e);
                process::exit(1);
            }
            buffer
        }
    };

    let exit_code = process_input(&input, input_path, &run);
    process::exit(exit_code);
}

fn set_mode(mode: &mut Option<Mode>, requested: Mode) {
    if mode.is_some_and(|m| m != requested) {
        eprintln!("Error: --check and --fmt are mutually exclusive");
        process::exit(1);
    }
    *mode = Some(requested);
}

fn process_directory(dir_path: &str, run: &Run) {
    let entries = match fs::read_dir(dir_path) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error reading directory {}: {}", dir_path, e);
            process::exit(1);
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|e| e == DOCUMENT_EXTENSION)
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    info!(dir = dir_path, documents = paths.len(), "processing directory");

    let mut had_errors = false;
    for path in paths {
        let path_str = path.to_string_lossy();
        let input = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading {}: {}", path_str, e);
                had_errors = true;
                continue;
            }
        };
        if process_input(&input, Some(&path_str), run) != 0 {
            had_errors = true;
        }
    }

    process::exit(if had_errors { 1 } else { 0 });
}

fn process_input(input: &str, input_file: Option<&str>, run: &Run) -> i32 {
    let name = input_file.unwrap_or("<stdin>");
    match run.mode {
        Mode::Check => {
            let diagnostics = run.validator.validate(input);
            debug!(file = name, diagnostics = diagnostics.len(), "validated");
            if run.json {
                match serde_json::to_string_pretty(&diagnostics) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return 1;
                    }
                }
            } else {
                print_diagnostics(name, &diagnostics);
            }
            if diagnostics.iter().any(|d| d.severity == Severity::Error) {
                1
            } else {
                0
            }
        }
        Mode::Format => {
            let edits = format(input, &run.options);
            debug!(file = name, edits = edits.len(), "formatted");
            if run.json {
                return match serde_json::to_string_pretty(&edits) {
                    Ok(text) => {
                        println!("{}", text);
                        0
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        1
                    }
                };
            }
            let output = apply_edits(input, &edits);
            write_text_output(&output, input_file, run.write_back, edits.is_empty())
        }
    }
}

fn print_diagnostics(name: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        println!("{}:{}", name, diagnostic);
    }
}

fn write_text_output(output: &str, input_file: Option<&str>, write_back: bool, unchanged: bool) -> i32 {
    if write_back {
        let Some(path) = input_file else {
            eprintln!("Error: --write requires an input file");
            return 1;
        };
        if unchanged {
            return 0;
        }
        if let Err(e) = fs::write(path, output) {
            eprintln!("Error writing {}: {}", path, e);
            return 1;
        }
        info!(file = path, "rewrote");
    } else {
        print!("{}", output);
        if !output.is_empty() && !output.ends_with('\n') {
            println!();
        }
    }
    0
}

fn print_help() {
    println!(
        "axcfg - dashboard configuration validator and formatter

USAGE:
    axcfg [OPTIONS] [FILE|DIR]

ARGS:
    [FILE|DIR]    Input file or directory (reads from stdin if not provided)
                  When a directory is given, processes all .config files in it

OPTIONS:
    --check                Validate and print one line per diagnostic
                           (exit 0 if no errors, 1 otherwise)

    --fmt                  Print the re-indented document [default]

    -w, --write            Write formatted output back to the input file

    --json                 Print diagnostics (with --check) or text edits
                           (with --fmt) as JSON

    --catalog <FILE>       Setting descriptors to validate against
                           (.yaml/.yml as YAML, anything else as JSON)
                           [default: built-in catalog]

    --config <FILE>        Configuration file [default: ./axcfg.toml if present]

    --tab-size <N>         Indentation width [default: 2]

    --use-tabs             Indent with tabs instead of spaces

    -h, --help             Print help

    -V, --version          Print version

ENVIRONMENT:
    RUST_LOG               Log filter for messages on stderr (e.g. axcfg=debug)

EXAMPLES:
    # Check a document
    axcfg --check portal.config

    # Check every document in a directory against custom descriptors
    axcfg --check --catalog settings.yaml ./portals/

    # Re-indent a document in place with 4 spaces
    axcfg -w --tab-size 4 portal.config

    # Print the edits the formatter would make
    axcfg --json < portal.config
"
    );
}
