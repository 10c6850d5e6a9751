//! Name-to-rule lookup for the `format` keyword.

use crate::format::{DateRule, EmailRule, FormatRule};
use std::collections::HashMap;
use std::fmt;

/// A mapping from format name to the rule that checks it.
///
/// Names without a registered rule are not an error: a node asking for an
/// unknown format accepts every value.
pub struct FormatRegistry {
    rules: HashMap<String, Box<dyn FormatRule>>,
}

impl FormatRegistry {
    /// An empty registry, without even the built-in rules.
    pub fn empty() -> Self {
        FormatRegistry {
            rules: HashMap::new(),
        }
    }

    /// A registry holding the built-in `date` and `email` rules, with `date`
    /// accepting the given patterns.
    pub fn with_builtins(date_formats: &[String]) -> Self {
        let mut registry = Self::empty();
        registry.register("date", DateRule::new(date_formats.iter().cloned()));
        registry.register("email", EmailRule::new());
        registry
    }

    /// Register a rule under `name`, returning the rule it replaces, if any.
    pub fn register<N, R>(&mut self, name: N, rule: R) -> Option<Box<dyn FormatRule>>
    where
        N: Into<String>,
        R: FormatRule + 'static,
    {
        self.rules.insert(name.into(), Box::new(rule))
    }

    /// The rule registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&dyn FormatRule> {
        self.rules.get(name).map(|rule| &**rule)
    }

    /// Whether a rule is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry")
            .field("rules", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatError;

    #[test]
    fn builtins() {
        let registry = FormatRegistry::with_builtins(&["%Y-%m-%d".to_owned()]);
        assert!(registry.contains("date"));
        assert!(registry.contains("email"));
        assert!(!registry.contains("uuid"));

        let date = registry.get("date").unwrap();
        assert!(date.check("2024-01-15").is_ok());
        assert!(date.check("15/01/2024").is_err());
    }

    #[test]
    fn register_replaces() {
        let mut registry = FormatRegistry::with_builtins(&["%Y-%m-%d".to_owned()]);
        let previous = registry.register("email", |_: &str| -> Result<(), FormatError> { Ok(()) });
        assert!(previous.is_some());
        assert!(registry.get("email").unwrap().check("anything").is_ok());

        let previous = registry.register("even", |value: &str| {
            if value.len() % 2 == 0 {
                Ok(())
            } else {
                Err(FormatError::custom("Expected an even length"))
            }
        });
        assert!(previous.is_none());
        assert!(registry.get("even").unwrap().check("abc").is_err());
    }

    #[test]
    fn empty_has_nothing() {
        assert!(FormatRegistry::empty().get("date").is_none());
        assert_eq!(
            format!("{:?}", FormatRegistry::with_builtins(&[])),
            r#"FormatRegistry { rules: ["date", "email"] }"#
        );
    }
}
