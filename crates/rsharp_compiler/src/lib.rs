//! rsharp_compiler: Compiler orchestration.
//!
//! Runs the front end over every source of a compilation: scan, parse,
//! bind and the flow pass, all reporting into one bag per unit. Units share
//! nothing, so they are compiled in parallel.

use rayon::prelude::*;
use rsharp_binder::{check_reachability, Binder};
use rsharp_core::{CancellationToken, Cancelled, CompilerArena, LineMap, StringInterner};
use rsharp_diagnostics::render::render_all;
use rsharp_diagnostics::{Diagnostic, DiagnosticBag, Severity};
use rsharp_options::CompilerOptions;
use rsharp_parser::{ParseOptions, Parser, DEFAULT_MAX_DEPTH};
use rsharp_scanner::scan_tokens;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// A source text and the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// The outcome of compiling one unit.
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub file_name: String,
    pub line_map: LineMap,
    /// Every diagnostic of the unit in detection order, or `Cancelled`.
    pub outcome: Result<DiagnosticBag, Cancelled>,
}

impl UnitResult {
    /// The diagnostics as `options` reports them. Empty for a cancelled unit.
    pub fn reported(&self, options: &CompilerOptions) -> Vec<Diagnostic> {
        match &self.outcome {
            Ok(bag) => options.apply(bag),
            Err(Cancelled) => Vec::new(),
        }
    }

    pub fn has_errors(&self, options: &CompilerOptions) -> bool {
        self.reported(options).iter().any(Diagnostic::is_error)
    }

    /// `file(line,column): severity code: message` lines for the reported,
    /// non-hidden diagnostics.
    pub fn render(&self, options: &CompilerOptions) -> String {
        let reported = self.reported(options);
        let visible = reported.iter().filter(|d| d.severity != Severity::Hidden);
        render_all(visible, Some(&self.file_name), &self.line_map)
    }
}

/// A set of sources compiled with one set of options.
pub struct Compilation {
    pub options: CompilerOptions,
    sources: Vec<SourceFile>,
    cancellation: Option<CancellationToken>,
}

impl Compilation {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            sources: Vec::new(),
            cancellation: None,
        }
    }

    /// Share `token` with every unit. Units observe it between members.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.push(SourceFile {
            name: name.into(),
            text: text.into(),
        });
    }

    /// Read every file in `paths` and add it under its path. Stops at the
    /// first file that cannot be read.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), CompileError> {
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            self.add_source(path.display().to_string(), text);
        }
        Ok(())
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Compile every source. Results come back in the order the sources were
    /// added, whether or not the units ran in parallel.
    pub fn compile(&self) -> Vec<UnitResult> {
        let cancel = self.cancellation.as_ref();
        let options = &self.options;
        let compile_one = |source: &SourceFile| UnitResult {
            file_name: source.name.clone(),
            line_map: LineMap::new(&source.text),
            outcome: compile_unit(&source.name, &source.text, options, cancel),
        };

        if options.parallel {
            self.sources.par_iter().map(compile_one).collect()
        } else {
            self.sources.iter().map(compile_one).collect()
        }
    }
}

/// Run the whole front end over one unit.
pub fn compile_unit(
    name: &str,
    text: &str,
    options: &CompilerOptions,
    cancel: Option<&CancellationToken>,
) -> Result<DiagnosticBag, Cancelled> {
    let arena = CompilerArena::for_source(text.len());
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();

    let tokens = scan_tokens(text, &mut bag);
    let parse_options = ParseOptions {
        max_depth: options
            .max_parse_depth
            .map_or(DEFAULT_MAX_DEPTH, |depth| depth.min(DEFAULT_MAX_DEPTH)),
    };
    let mut parser = Parser::new(arena.bump(), &interner, &tokens, &mut bag).with_options(parse_options);
    if let Some(token) = cancel {
        parser = parser.with_cancellation(token);
    }
    let unit = parser.parse_compilation_unit()?;

    let mut binder = Binder::new(&mut bag);
    if let Some(token) = cancel {
        binder = binder.with_cancellation(token);
    }
    binder.bind_compilation_unit(&unit)?;
    let bound = binder.finish();
    check_reachability(&unit, &tokens, &bound, &mut bag);

    debug!(
        file = name,
        tokens = tokens.len(),
        diagnostics = bag.len(),
        arena_bytes = arena.allocated_bytes(),
        "compiled unit"
    );
    Ok(bag)
}

/// Compile `text` as a single unit with default options and return every
/// diagnostic in detection order.
pub fn compile_source(text: &str) -> DiagnosticBag {
    // Without a cancellation token the pipeline cannot fail.
    compile_unit("", text, &CompilerOptions::default(), None).unwrap_or_default()
}
