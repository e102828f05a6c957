//! Site configuration validation.
//!
//! Validation runs on the deserialized `SiteConfig` and collects every
//! error and warning instead of stopping at the first one.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::loader::ConfigLimits;
use crate::config::schema::{NEVER, RouterMode, SiteConfig, Step};
use crate::error::{Severity, ValidationIssue};
use crate::link::Href;
use crate::route::RoutePath;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &SiteConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        let routes = self.validate_site(config);
        self.validate_transition(config);
        self.validate_router(config);
        let sections = self.validate_nav(config, &routes);
        self.validate_scenario(config, &routes, &sections);
        self.validate_limits(config, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Site
    // ========================================================================

    /// Validates site metadata and returns the parsed route table.
    fn validate_site(&mut self, config: &SiteConfig) -> Vec<RoutePath> {
        let site = &config.site;

        if site.name.trim().is_empty() {
            self.add_error("site.name", "Site name is required and cannot be empty");
        }
        if site.name.len() > 100 {
            self.add_warning("site.name", "Site name is unusually long (> 100 characters)");
        }

        if let Some(origin) = &site.origin {
            if !(origin.starts_with("https://") || origin.starts_with("http://")) {
                self.add_error(
                    "site.origin",
                    &format!("Origin '{origin}' must start with http:// or https://"),
                );
            }
        }

        let mut routes = Vec::with_capacity(site.routes.len());
        let mut seen = HashSet::new();
        for (i, raw) in site.routes.iter().enumerate() {
            let path = format!("site.routes[{i}]");
            match RoutePath::parse(raw) {
                Ok(route) => {
                    if !seen.insert(route.clone()) {
                        self.add_warning(&path, &format!("Duplicate route '{raw}'"));
                    }
                    routes.push(route);
                }
                Err(e) => self.add_error(&path, &e.to_string()),
            }
        }

        match RoutePath::parse(&site.start_path) {
            Ok(start) => {
                if !routes.is_empty() && !routes.contains(&start) {
                    self.add_error(
                        "site.start_path",
                        &with_suggestion(
                            format!("Start path '{start}' is not a known route"),
                            start.as_str(),
                            &routes,
                        ),
                    );
                }
            }
            Err(e) => self.add_error("site.start_path", &e.to_string()),
        }

        routes
    }

    // ========================================================================
    // Transition & Router
    // ========================================================================

    fn validate_transition(&mut self, config: &SiteConfig) {
        let transition = &config.transition;

        if let Some(raw) = &transition.cover_duration {
            if let Some(d) = self.validate_duration(raw, "transition.cover_duration") {
                if d.is_zero() {
                    self.add_warning(
                        "transition.cover_duration",
                        "Zero cover duration navigates before the overlay is visible",
                    );
                }
            }
        }

        if let Some(raw) = &transition.frame_interval {
            self.validate_duration(raw, "transition.frame_interval");
        }

        if let Some(raw) = &transition.reveal_duration {
            if raw.trim() == NEVER {
                self.add_warning(
                    "transition.reveal_duration",
                    "Reveal never finishes; transitions stay in 'revealing' until reveal_done",
                );
            } else {
                self.validate_duration(raw, "transition.reveal_duration");
            }
        }
    }

    fn validate_router(&mut self, config: &SiteConfig) {
        let router = &config.router;
        match (router.mode, &router.latency) {
            (RouterMode::Delayed, None) => {
                self.add_error("router.latency", "Delayed router mode requires a latency");
            }
            (RouterMode::Delayed, Some(raw)) => {
                self.validate_duration(raw, "router.latency");
            }
            (_, Some(_)) => {
                self.add_warning("router.latency", "Latency is ignored unless mode is 'delayed'");
            }
            (_, None) => {}
        }

        if router.mode == RouterMode::Stalled {
            self.add_warning(
                "router.mode",
                "Stalled router never commits; transitions stop at 'covered'",
            );
        }
    }

    // ========================================================================
    // Nav
    // ========================================================================

    /// Validates nav entries and returns their section ids.
    fn validate_nav(&mut self, config: &SiteConfig, routes: &[RoutePath]) -> Vec<String> {
        let links = config.nav_links();
        let mut sections = Vec::with_capacity(links.len());

        for (i, link) in links.iter().enumerate() {
            let path = format!("nav[{i}]");
            if link.section.trim().is_empty() {
                self.add_error(&format!("{path}.section"), "Section id cannot be empty");
            } else if sections.contains(&link.section) {
                self.add_error(
                    &format!("{path}.section"),
                    &format!("Duplicate section '{}'", link.section),
                );
            } else {
                sections.push(link.section.clone());
            }

            if link.label.trim().is_empty() {
                self.add_warning(&format!("{path}.label"), "Nav entry has no label");
            }

            self.validate_href(
                &link.href,
                config.site.origin.as_deref(),
                routes,
                &format!("{path}.href"),
            );
        }

        sections
    }

    // ========================================================================
    // Scenario
    // ========================================================================

    fn validate_scenario(&mut self, config: &SiteConfig, routes: &[RoutePath], sections: &[String]) {
        let mut entered = !config.landing.enabled;

        for (i, step) in config.scenario.iter().enumerate() {
            let path = format!("scenario[{i}]");
            match step {
                Step::Enter => {
                    if entered {
                        self.add_warning(&path, "Site already entered; step has no effect");
                    }
                    entered = true;
                }
                Step::Click { href, .. } => {
                    if !entered {
                        self.add_warning(&path, "Click before 'enter'; links are not mounted yet");
                    }
                    self.validate_href(
                        href,
                        config.site.origin.as_deref(),
                        routes,
                        &format!("{path}.href"),
                    );
                }
                Step::Nav { section } => {
                    if !entered {
                        self.add_warning(&path, "Nav click before 'enter'; nav is not mounted yet");
                    }
                    if !sections.contains(section) {
                        let msg = suggest(section, sections.iter().map(String::as_str)).map_or_else(
                            || format!("Unknown nav section '{section}'"),
                            |s| format!("Unknown nav section '{section}'. Did you mean '{s}'?"),
                        );
                        self.add_error(&format!("{path}.section"), &msg);
                    }
                }
                Step::Wait { duration } => {
                    self.validate_duration(duration, &format!("{path}.duration"));
                }
                Step::Commit { path: raw } => match RoutePath::parse(raw) {
                    Ok(route) => {
                        if !routes.is_empty() && !routes.contains(&route) {
                            self.add_warning(
                                &format!("{path}.path"),
                                &with_suggestion(
                                    format!("Commit to unknown route '{route}'"),
                                    route.as_str(),
                                    routes,
                                ),
                            );
                        }
                    }
                    Err(e) => self.add_error(&format!("{path}.path"), &e.to_string()),
                },
                Step::ToggleMenu | Step::RevealDone | Step::Scroll { .. } => {}
            }
        }
    }

    // ========================================================================
    // Limits
    // ========================================================================

    fn validate_limits(&mut self, config: &SiteConfig, limits: &ConfigLimits) {
        if config.site.routes.len() > limits.max_routes {
            self.add_error(
                "site.routes",
                &format!(
                    "Too many routes: {} (max {})",
                    config.site.routes.len(),
                    limits.max_routes
                ),
            );
        }
        if config.scenario.len() > limits.max_steps {
            self.add_error(
                "scenario",
                &format!(
                    "Too many scenario steps: {} (max {})",
                    config.scenario.len(),
                    limits.max_steps
                ),
            );
        }
    }

    // ========================================================================
    // Shared Checks
    // ========================================================================

    /// Validates a duration string and returns it parsed.
    fn validate_duration(&mut self, raw: &str, path: &str) -> Option<Duration> {
        if raw.trim().is_empty() {
            self.add_error(path, "Duration cannot be empty");
            return None;
        }
        match parse_duration(raw) {
            Some(d) => Some(d),
            None => {
                self.add_error(
                    path,
                    &format!("Invalid duration '{raw}'. Expected e.g. '16ms' or '2s'"),
                );
                None
            }
        }
    }

    /// Internal hrefs must be known routes when a route table is set.
    fn validate_href(&mut self, href: &str, origin: Option<&str>, routes: &[RoutePath], path: &str) {
        if href.trim().is_empty() {
            self.add_error(path, "Link href cannot be empty");
            return;
        }
        match Href::classify(href, origin) {
            Href::Internal(route) | Href::PageAnchor { path: route, .. } => {
                if !routes.is_empty() && !routes.contains(&route) {
                    self.add_warning(
                        path,
                        &with_suggestion(
                            format!("Link to unknown route '{route}'"),
                            route.as_str(),
                            routes,
                        ),
                    );
                }
            }
            Href::Unroutable(_) => {
                self.add_warning(
                    path,
                    &format!("Relative href '{href}' is never intercepted"),
                );
            }
            Href::External(_) | Href::Anchor(_) => {}
        }
    }

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parses a human-readable duration such as `16ms` or `2s`.
#[must_use]
pub fn parse_duration(raw: &str) -> Option<Duration> {
    humantime::parse_duration(raw.trim()).ok()
}

/// Closest candidate within a Damerau-Levenshtein distance of 3.
#[must_use]
pub fn suggest<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|c| (c, strsim::damerau_levenshtein(input, c)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(c, _)| c)
}

fn with_suggestion(message: String, input: &str, routes: &[RoutePath]) -> String {
    match suggest(input, routes.iter().map(RoutePath::as_str)) {
        Some(s) => format!("{message}. Did you mean '{s}'?"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(yaml: &str) -> ValidationResult {
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        Validator::new().validate(&config, &ConfigLimits::default())
    }

    fn messages(issues: &[ValidationIssue]) -> Vec<String> {
        issues.iter().map(ToString::to_string).collect()
    }

    const ROUTES: &str = r"
site:
  name: portfolio
  routes: [/, /about, /projects, /contact]
";

    #[test]
    fn test_valid_minimal() {
        let result = validate(ROUTES);
        assert!(result.is_valid(), "{:?}", messages(&result.errors));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_name() {
        let result = validate("site:\n  name: ''\n");
        assert!(result.has_errors());
        assert_eq!(result.errors[0].path, "site.name");
    }

    #[test]
    fn test_bad_routes_and_start_path() {
        let result = validate(
            r"
site:
  name: portfolio
  start_path: /abot
  routes: [/, /about, about]
",
        );
        let errors = messages(&result.errors);
        assert!(errors.iter().any(|e| e.contains("site.routes[2]")));
        assert!(
            errors
                .iter()
                .any(|e| e.contains("not a known route") && e.contains("Did you mean '/about'?")),
            "{errors:?}"
        );
    }

    #[test]
    fn test_invalid_durations() {
        let result = validate(
            r"
site:
  name: portfolio
transition:
  cover_duration: fast
  frame_interval: 16ms
  reveal_duration: never
",
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "transition.cover_duration");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "transition.reveal_duration");
    }

    #[test]
    fn test_delayed_router_requires_latency() {
        let result = validate("site:\n  name: p\nrouter:\n  mode: delayed\n");
        assert_eq!(result.errors[0].path, "router.latency");

        let result = validate("site:\n  name: p\nrouter:\n  mode: immediate\n  latency: 5ms\n");
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].path, "router.latency");
    }

    #[test]
    fn test_scenario_checks() {
        let yaml = format!(
            "{ROUTES}scenario:
  - action: click
    href: /projets
  - action: enter
  - action: nav
    section: contcat
  - action: wait
    duration: soon
"
        );
        let result = validate(&yaml);
        let errors = messages(&result.errors);
        assert!(
            errors
                .iter()
                .any(|e| e.contains("Unknown nav section 'contcat'. Did you mean 'contact'?")),
            "{errors:?}"
        );
        assert!(errors.iter().any(|e| e.contains("scenario[3].duration")));

        let warnings = messages(&result.warnings);
        assert!(warnings.iter().any(|w| w.contains("Click before 'enter'")));
        assert!(
            warnings
                .iter()
                .any(|w| w.contains("unknown route '/projets'") && w.contains("'/projects'"))
        );
    }

    #[test]
    fn test_duplicate_nav_sections() {
        let result = validate(
            r"
site:
  name: portfolio
nav:
  - { href: /, label: Home, section: hero }
  - { href: /about, label: About, section: hero }
",
        );
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("Duplicate section"));
    }

    #[test]
    fn test_limits() {
        let config: SiteConfig = serde_yaml::from_str(ROUTES).unwrap();
        let limits = ConfigLimits {
            max_routes: 2,
            ..ConfigLimits::default()
        };
        let result = Validator::new().validate(&config, &limits);
        assert!(result.errors[0].message.contains("Too many routes"));
    }

    #[test]
    fn test_suggest() {
        assert_eq!(suggest("abuot", ["about", "contact"]), Some("about"));
        assert_eq!(suggest("zzzzzzzz", ["about", "contact"]), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("16ms"), Some(Duration::from_millis(16)));
        assert_eq!(parse_duration(" 1s "), Some(Duration::from_secs(1)));
        assert_eq!(parse_duration("never"), None);
    }
}
