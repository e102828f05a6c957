//! Site configuration loader.
//!
//! Loading runs in stages:
//! 1. Size check and BOM strip
//! 2. Environment variable expansion (on raw text, before parsing)
//! 3. YAML parsing into `SiteConfig`
//! 4. Validation
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::schema::SiteConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Limits that keep a site file from exhausting resources.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of declared routes.
    pub max_routes: usize,

    /// Maximum number of scenario steps.
    pub max_steps: usize,

    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_routes: env_or("PAGESHIFT_MAX_ROUTES", 1000),
            max_steps: env_or("PAGESHIFT_MAX_STEPS", 10_000),
            max_config_size: env_or("PAGESHIFT_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<SiteConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Loads, validates and freezes a site file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is unset
    /// - YAML parsing fails
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        debug!(path = %path.display(), bytes = raw.len(), "site file read");

        self.load_str(&raw, path)
    }

    /// Runs the pipeline on already-read text. `path` is used for error
    /// reporting only.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus file access.
    pub fn load_str(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, path)?;
        warnings.extend(env_sub.warnings);

        if substituted.trim().is_empty() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "Configuration file is empty".to_string(),
            });
        }

        let config: SiteConfig =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let result = Validator::new().validate(&config, &self.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text so substituted values keep YAML type inference.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = parse_var_spec(&mut chars, source_path)?;
                    match std::env::var(&spec.name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => match spec.fallback {
                            Fallback::Default(default) => result.push_str(&default),
                            Fallback::Required(message) => {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: spec.name,
                                    message,
                                });
                            }
                            Fallback::Empty => {
                                self.warnings.push(LoadWarning {
                                    message: format!(
                                        "Environment variable '{}' is not set, using empty string",
                                        spec.name
                                    ),
                                    location: Some(source_path.display().to_string()),
                                });
                            }
                        },
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }
}

enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

struct VarSpec {
    name: String,
    fallback: Fallback,
}

/// Parses the inside of `${...}`; the opening brace is already consumed.
fn parse_var_spec(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<VarSpec, ConfigError> {
    let mut name = String::new();

    while let Some(c) = chars.next() {
        match c {
            '}' => {
                return Ok(VarSpec {
                    name,
                    fallback: Fallback::Empty,
                });
            }
            ':' => match chars.peek() {
                Some('-') => {
                    chars.next();
                    let default = read_until_close(chars, source_path)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Default(default),
                    });
                }
                Some('?') => {
                    chars.next();
                    let message = read_until_close(chars, source_path)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Required(message),
                    });
                }
                _ => name.push(':'),
            },
            _ => name.push(c),
        }
    }

    Err(unclosed(source_path, &name))
}

/// Reads until the matching `}`, allowing nested braces.
fn read_until_close(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<String, ConfigError> {
    let mut value = String::new();
    let mut depth = 1;

    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(value);
                }
            }
            _ => {}
        }
        value.push(c);
    }

    Err(unclosed(source_path, &value))
}

fn unclosed(source_path: &Path, fragment: &str) -> ConfigError {
    ConfigError::ParseError {
        path: source_path.to_path_buf(),
        line: None,
        message: format!("Unclosed environment variable reference: ${{{fragment}"),
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(yaml: &str) -> Result<LoadResult, ConfigError> {
        ConfigLoader::default().load_str(yaml, Path::new("site.yaml"))
    }

    #[test]
    fn test_env_substitution_simple() {
        // PATH is set on every platform the tests run on
        let mut sub = EnvSubstitution::new();
        let result = sub.substitute("path: ${PATH}", Path::new("t.yaml")).unwrap();
        assert!(!result.contains("${PATH}"));
        assert!(result.len() > "path: ".len());
    }

    #[test]
    fn test_env_substitution_default() {
        let mut sub = EnvSubstitution::new();
        let result = sub
            .substitute("origin: ${PAGESHIFT_TEST_UNSET_ORIGIN_91:-https://example.dev}", Path::new("t.yaml"))
            .unwrap();
        assert_eq!(result, "origin: https://example.dev");
    }

    #[test]
    fn test_env_substitution_required_missing() {
        let mut sub = EnvSubstitution::new();
        let result = sub.substitute(
            "name: ${PAGESHIFT_TEST_REQUIRED_91:?site name must be set}",
            Path::new("t.yaml"),
        );
        match result {
            Err(ConfigError::EnvVarNotSet { var, message }) => {
                assert_eq!(var, "PAGESHIFT_TEST_REQUIRED_91");
                assert_eq!(message, "site name must be set");
            }
            other => panic!("expected EnvVarNotSet, got {other:?}"),
        }
    }

    #[test]
    fn test_env_substitution_escaped_dollar() {
        let mut sub = EnvSubstitution::new();
        let result = sub.substitute("label: $$5 tier", Path::new("t.yaml")).unwrap();
        assert_eq!(result, "label: $5 tier");
    }

    #[test]
    fn test_env_substitution_missing_warning() {
        let mut sub = EnvSubstitution::new();
        let result = sub
            .substitute("name: ${PAGESHIFT_TEST_WARN_91}", Path::new("t.yaml"))
            .unwrap();
        assert_eq!(result, "name: ");
        assert_eq!(sub.warnings.len(), 1);
        assert!(sub.warnings[0].message.contains("PAGESHIFT_TEST_WARN_91"));
    }

    #[test]
    fn test_env_substitution_unclosed() {
        let mut sub = EnvSubstitution::new();
        let result = sub.substitute("name: ${OOPS", Path::new("t.yaml"));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_valid() {
        let result = load(
            "\u{feff}site:\n  name: portfolio\n  routes: [/, /about, /projects, /contact]\n",
        )
        .unwrap();
        assert_eq!(result.config.site.name, "portfolio");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_load_empty() {
        assert!(matches!(load("  \n"), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_parse_error_has_line() {
        match load("site:\n  name: [unclosed\n") {
            Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_load_validation_error() {
        match load("site:\n  name: ''\n") {
            Err(ConfigError::ValidationError { errors, .. }) => {
                assert_eq!(errors[0].path, "site.name");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_load_warnings_carried() {
        let result = load("site:\n  name: p\nrouter:\n  mode: stalled\n").unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].location.as_deref(), Some("router.mode"));
    }

    #[test]
    fn test_load_file_and_size_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "site:\n  name: portfolio").unwrap();

        let result = ConfigLoader::default().load(file.path()).unwrap();
        assert_eq!(result.config.site.name, "portfolio");

        let tiny = ConfigLoader::new(ConfigLimits {
            max_config_size: 4,
            ..ConfigLimits::default()
        });
        assert!(matches!(
            tiny.load(file.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigLoader::default().load(Path::new("/nonexistent/site.yaml"));
        assert!(matches!(result, Err(ConfigError::MissingFile { .. })));
    }
}
