//! rsc: The rsharp C# front-end CLI.
//!
//! Usage:
//!   rsc [options] [file...]
//!
//! Compiles the given files (or the files of an rsharp.json project) and
//! prints their diagnostics. Exit code 0 when no errors were reported, 1 on
//! usage, I/O or configuration errors, 2 when compilation reported errors.

use clap::{Parser as ClapParser, ValueEnum};
use miette::{LabeledSpan, MietteDiagnostic, NamedSource, Report};
use rsharp_compiler::{Compilation, SourceFile, UnitResult};
use rsharp_diagnostics::render::DiagnosticRecord;
use rsharp_diagnostics::{Diagnostic, Severity};
use rsharp_options::{parse_config_file, CompilerOptions, ProjectConfig};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "rsc", about = "rsharp - A C# front end written in Rust", disable_version_flag = true)]
struct Cli {
    /// C# files to compile.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to rsharp.json.
    #[arg(short = 'p', long = "project")]
    project: Option<PathBuf>,

    /// Report all warnings as errors.
    #[arg(long = "warnaserror")]
    warn_as_error: bool,

    /// Comma-separated warning codes to suppress, e.g. CS0162,CS0164.
    #[arg(long = "nowarn", value_delimiter = ',')]
    no_warn: Vec<String>,

    /// Warning level (0-4).
    #[arg(long = "warn", value_parser = clap::value_parser!(u8).range(0..=4))]
    warning_level: Option<u8>,

    /// Diagnostic output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Render diagnostics as annotated source snippets.
    #[arg(long)]
    pretty: bool,

    /// List all files that are part of the compilation.
    #[arg(long = "list-files")]
    list_files: bool,

    /// Compile units one after another instead of in parallel.
    #[arg(long)]
    sequential: bool,

    /// Print the compiler version.
    #[arg(short = 'v', long)]
    version: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("rsc Version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    init_logging();
    let exit_code = run_compile(&cli);
    process::exit(exit_code);
}

/// Log to stderr, filtered by `RSHARP_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("RSHARP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_compile(cli: &Cli) -> i32 {
    let start = Instant::now();

    let (files, config) = match resolve_input_files(cli) {
        Ok(resolved) => resolved,
        Err(message) => {
            print_error(&message);
            return 1;
        }
    };

    if files.is_empty() {
        print_error("No input files found.");
        return 1;
    }

    if cli.list_files {
        for file in &files {
            println!("{}", file.display());
        }
    }

    // CLI options override rsharp.json
    let mut options = config.map(|c| c.compiler_options).unwrap_or_default();
    apply_cli_overrides(cli, &mut options);
    if let Err(e) = options.validate() {
        print_error(&e.to_string());
        return 1;
    }

    let mut compilation = Compilation::new(options);
    if let Err(e) = compilation.load_files(&files) {
        print_error(&format!("Failed to load source files: {}", e));
        return 1;
    }
    let results = compilation.compile();
    tracing::debug!(units = results.len(), elapsed_ms = start.elapsed().as_millis() as u64, "compiled");

    let options = &compilation.options;
    let use_color = std::io::stderr().is_terminal();
    let mut error_count = 0;
    for (result, source) in results.iter().zip(compilation.sources()) {
        if result.outcome.is_err() {
            print_error(&format!("Compilation of '{}' was cancelled.", result.file_name));
            continue;
        }
        let reported: Vec<Diagnostic> = result
            .reported(options)
            .into_iter()
            .filter(|d| d.severity != Severity::Hidden)
            .collect();
        error_count += reported.iter().filter(|d| d.is_error()).count();

        match cli.format {
            OutputFormat::Json => print_json(result, &reported),
            OutputFormat::Text if cli.pretty => print_pretty(source, &reported),
            OutputFormat::Text => {
                for diagnostic in &reported {
                    print_diagnostic(result, diagnostic, use_color);
                }
            }
        }
    }

    let elapsed = start.elapsed();

    if error_count > 0 {
        if cli.format == OutputFormat::Text {
            let plural = if error_count == 1 { "" } else { "s" };
            if use_color {
                eprintln!("\n{}Found {} error{}.{}", RED, error_count, plural, RESET);
            } else {
                eprintln!("\nFound {} error{}.", error_count, plural);
            }
        }
        return 2;
    }

    if use_color && cli.format == OutputFormat::Text {
        eprintln!("{}Compilation completed in {:.2}s.{}", GRAY, elapsed.as_secs_f64(), RESET);
    }

    0
}

fn apply_cli_overrides(cli: &Cli, options: &mut CompilerOptions) {
    if cli.warn_as_error {
        options.treat_warnings_as_errors = true;
    }
    if let Some(level) = cli.warning_level {
        options.warning_level = level;
    }
    options.no_warn.extend(cli.no_warn.iter().map(|code| code.trim().to_string()));
    if cli.sequential {
        options.parallel = false;
    }
}

fn resolve_input_files(cli: &Cli) -> Result<(Vec<PathBuf>, Option<ProjectConfig>), String> {
    if let Some(project) = &cli.project {
        return load_files_from_project(project).map(|(files, config)| (files, Some(config)));
    }
    if !cli.files.is_empty() {
        return Ok((cli.files.clone(), None));
    }
    let default_project = Path::new("rsharp.json");
    if default_project.exists() {
        return load_files_from_project(default_project).map(|(files, config)| (files, Some(config)));
    }
    Ok((Vec::new(), None))
}

fn load_files_from_project(path: &Path) -> Result<(Vec<PathBuf>, ProjectConfig), String> {
    let config = parse_config_file(path).map_err(|e| format!("Failed to read project '{}': {}", path.display(), e))?;
    let root_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let files = config.resolve_files(root_dir);
    Ok((files, config))
}

fn print_diagnostic(result: &UnitResult, diagnostic: &Diagnostic, use_color: bool) {
    if !use_color {
        eprintln!("{}", rsharp_diagnostics::render::render(diagnostic, Some(&result.file_name), &result.line_map));
        return;
    }
    let color = if diagnostic.is_error() { RED } else { YELLOW };
    let position = result.line_map.position_of(diagnostic.span.start);
    eprintln!(
        "{}{}{}{}: {}{}{}{} {}{}{}: {}",
        CYAN,
        result.file_name,
        RESET,
        position,
        BOLD,
        color,
        diagnostic.severity,
        RESET,
        CYAN,
        diagnostic.id(),
        RESET,
        diagnostic.message_text()
    );
}

/// One JSON object per line on stdout.
fn print_json(result: &UnitResult, reported: &[Diagnostic]) {
    for diagnostic in reported {
        let record = DiagnosticRecord::new(diagnostic, Some(&result.file_name), &result.line_map);
        match serde_json::to_string(&record) {
            Ok(line) => println!("{}", line),
            Err(e) => print_error(&format!("Failed to serialize diagnostic: {}", e)),
        }
    }
}

fn print_pretty(source: &SourceFile, reported: &[Diagnostic]) {
    for diagnostic in reported {
        let severity = match diagnostic.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Hidden => miette::Severity::Advice,
        };
        let span = diagnostic.span.to_range();
        let report = MietteDiagnostic::new(diagnostic.message_text())
            .with_code(diagnostic.id())
            .with_severity(severity)
            .with_label(LabeledSpan::at(span, "here"));
        let named = NamedSource::new(&source.name, source.text.clone());
        eprintln!("{:?}", Report::new(report).with_source_code(named));
    }
}

fn print_error(msg: &str) {
    if std::io::stderr().is_terminal() {
        eprintln!("{}{}error{}: {}", BOLD, RED, RESET, msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_for(args: &[&str]) -> CompilerOptions {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut options = CompilerOptions::default();
        apply_cli_overrides(&cli, &mut options);
        options
    }

    #[test]
    fn test_overrides_apply() {
        let options = options_for(&[
            "rsc",
            "--warnaserror",
            "--nowarn",
            "CS0162, 164",
            "--warn",
            "1",
            "--sequential",
            "a.cs",
        ]);
        assert!(options.treat_warnings_as_errors);
        assert_eq!(options.no_warn, vec!["CS0162", "164"]);
        assert_eq!(options.warning_level, 1);
        assert!(!options.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_bad_nowarn_code_is_rejected() {
        let options = options_for(&["rsc", "--nowarn", "CS0162,foo", "a.cs"]);
        assert!(matches!(options.validate(), Err(rsharp_options::ConfigError::Invalid(_))));
    }

    #[test]
    fn test_warning_level_range() {
        assert!(Cli::try_parse_from(["rsc", "--warn", "5", "a.cs"]).is_err());
    }
}
