//! rsharp_options: rsharp.json parsing and compiler options.
//!
//! Parses project files and provides the `CompilerOptions` that decide how
//! the diagnostics of a unit are reported.

use indexmap::IndexMap;
use rsharp_diagnostics::{parse_code, Diagnostic, DiagnosticBag, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Highest warning level; every warning is reported at this level.
pub const MAX_WARNING_LEVEL: u8 = 4;

/// Largest accepted `maxParseDepth`, the parser's default nesting limit.
/// The limit can be lowered but not raised.
pub const MAX_PARSE_DEPTH: u32 = 256;

/// How a single diagnostic code is reported, as written in `diagnosticOptions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportDiagnostic {
    Error,
    Warning,
    /// Kept in the reported view but never printed.
    Hidden,
    /// Removed from the reported view.
    Suppress,
}

/// Compiler options, matching the `compilerOptions` object of rsharp.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    // -- Reporting --
    pub warning_level: u8,
    pub treat_warnings_as_errors: bool,
    pub no_warn: Vec<String>,
    pub diagnostic_options: IndexMap<String, ReportDiagnostic>,

    // -- Front end --
    /// Overrides the parser's nesting limit.
    pub max_parse_depth: Option<u32>,
    pub parallel: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            warning_level: MAX_WARNING_LEVEL,
            treat_warnings_as_errors: false,
            no_warn: Vec::new(),
            diagnostic_options: IndexMap::new(),
            max_parse_depth: None,
            parallel: true,
        }
    }
}

impl CompilerOptions {
    /// Check values serde cannot: code spellings and numeric ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warning_level > MAX_WARNING_LEVEL {
            return Err(ConfigError::Invalid(format!(
                "warningLevel must be between 0 and {}, got {}",
                MAX_WARNING_LEVEL, self.warning_level
            )));
        }
        if let Some(depth) = self.max_parse_depth {
            if depth == 0 || depth > MAX_PARSE_DEPTH {
                return Err(ConfigError::Invalid(format!(
                    "maxParseDepth must be between 1 and {}, got {}",
                    MAX_PARSE_DEPTH, depth
                )));
            }
        }
        for id in self.no_warn.iter().chain(self.diagnostic_options.keys()) {
            if parse_code(id).is_none() {
                return Err(ConfigError::Invalid(format!("'{}' is not a diagnostic code", id)));
            }
        }
        Ok(())
    }

    /// The reported view of `bag`: suppressions and warning-level filtering
    /// applied, severities overridden and warnings promoted as configured.
    /// Order is preserved and the bag itself is left untouched.
    ///
    /// Errors are always reported as errors.
    pub fn apply(&self, bag: &DiagnosticBag) -> Vec<Diagnostic> {
        let no_warn: Vec<u32> = self.no_warn.iter().filter_map(|id| parse_code(id)).collect();
        let overrides: IndexMap<u32, ReportDiagnostic> = self
            .diagnostic_options
            .iter()
            .filter_map(|(id, report)| parse_code(id).map(|code| (code, *report)))
            .collect();

        let mut reported = Vec::with_capacity(bag.len());
        for diagnostic in bag.iter() {
            if diagnostic.message.severity != Severity::Warning {
                reported.push(diagnostic.clone());
                continue;
            }
            let code = diagnostic.code();
            if no_warn.contains(&code) {
                continue;
            }
            let severity = match overrides.get(&code) {
                Some(ReportDiagnostic::Suppress) => continue,
                Some(ReportDiagnostic::Hidden) => Severity::Hidden,
                Some(ReportDiagnostic::Error) => Severity::Error,
                Some(ReportDiagnostic::Warning) => Severity::Warning,
                None if diagnostic.message.level > self.warning_level => continue,
                None if self.treat_warnings_as_errors => Severity::Error,
                None => Severity::Warning,
            };
            reported.push(diagnostic.clone().with_severity(severity));
        }
        reported
    }
}

/// The rsharp.json file structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub files: Vec<String>,
    pub compiler_options: CompilerOptions,
}

impl ProjectConfig {
    /// The listed files, relative ones resolved against `base`.
    pub fn resolve_files(&self, base: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|file| {
                let path = Path::new(file);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    base.join(path)
                }
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rsharp.json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid compiler option: {0}")]
    Invalid(String),
}

/// Parse an rsharp.json file from a string.
pub fn parse_config_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = serde_json::from_str(content)?;
    config.compiler_options.validate()?;
    Ok(config)
}

/// Parse an rsharp.json file from a path.
pub fn parse_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_str(&content)?;
    debug!(path = %path.display(), files = config.files.len(), "loaded project file");
    Ok(config)
}
