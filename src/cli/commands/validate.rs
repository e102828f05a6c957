//! Site file validation.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, PageshiftError, Severity, ValidationIssue};

#[derive(Debug, Serialize)]
struct IssueReport {
    path: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<IssueReport>,
    warnings: Vec<IssueReport>,
}

/// Validate every file and report the result.
///
/// All files are checked before the command fails, so one bad file does
/// not hide problems in the others.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, or a configuration
/// error if any file fails validation (or has warnings under `--strict`).
pub fn run(args: &ValidateArgs) -> Result<(), PageshiftError> {
    let loader = ConfigLoader::default();
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_failure: Option<ConfigError> = None;

    for path in &args.files {
        if !path.exists() {
            return Err(PageshiftError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating site file");

        let file = path.display().to_string();
        let report = match loader.load(path) {
            Ok(loaded) => {
                let warnings: Vec<_> = loaded.warnings.iter().map(warning_report).collect();
                let valid = !(args.strict && !warnings.is_empty());
                if !valid && first_failure.is_none() {
                    first_failure = Some(ConfigError::ValidationError {
                        path: file.clone(),
                        errors: loaded.warnings.iter().map(promote).collect(),
                    });
                }
                FileReport {
                    file,
                    valid,
                    errors: Vec::new(),
                    warnings,
                }
            }
            Err(e) => {
                let errors = match &e {
                    ConfigError::ValidationError { errors, .. } => {
                        errors.iter().map(issue_report).collect()
                    }
                    other => vec![IssueReport {
                        path: String::new(),
                        message: other.to_string(),
                    }],
                };
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
                FileReport {
                    file,
                    valid: false,
                    errors,
                    warnings: Vec::new(),
                }
            }
        };
        reports.push(report);
    }

    match args.format {
        OutputFormat::Human => print_human(&reports),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    first_failure.map_or(Ok(()), |e| Err(e.into()))
}

fn print_human(reports: &[FileReport]) {
    for report in reports {
        let mark = if report.valid { "ok" } else { "FAILED" };
        println!("{}: {mark}", report.file);
        for issue in &report.errors {
            print_issue("error", issue);
        }
        for issue in &report.warnings {
            print_issue("warning", issue);
        }
    }
}

fn print_issue(kind: &str, issue: &IssueReport) {
    if issue.path.is_empty() {
        println!("  {kind}: {}", issue.message);
    } else {
        println!("  {kind}: {} ({})", issue.message, issue.path);
    }
}

fn issue_report(issue: &ValidationIssue) -> IssueReport {
    IssueReport {
        path: issue.path.clone(),
        message: issue.message.clone(),
    }
}

fn warning_report(warning: &LoadWarning) -> IssueReport {
    IssueReport {
        path: warning.location.clone().unwrap_or_default(),
        message: warning.message.clone(),
    }
}

fn promote(warning: &LoadWarning) -> ValidationIssue {
    ValidationIssue {
        path: warning.location.clone().unwrap_or_default(),
        message: warning.message.clone(),
        severity: Severity::Error,
    }
}
