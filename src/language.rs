use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder that marks the argv slot receiving the in-container source path.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// A run command modeled as an ordered argument vector with one designated
/// substitution slot, rather than a shell string the source path gets
/// concatenated into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the template against the in-container source path.
    ///
    /// The placeholder is substituted into its own argv slot; a template
    /// without a placeholder gets the path appended as a trailing argument.
    pub fn resolve(&self, source_path: &str) -> Vec<String> {
        let mut resolved: Vec<String> = Vec::with_capacity(self.argv.len() + 1);
        let mut substituted = false;

        for arg in &self.argv {
            if arg == SOURCE_PLACEHOLDER {
                resolved.push(source_path.to_string());
                substituted = true;
            } else {
                resolved.push(arg.clone());
            }
        }

        if !substituted {
            resolved.push(source_path.to_string());
        }

        resolved
    }
}

/// Immutable runtime profile for one supported language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageProfile {
    #[serde(default)]
    pub id: String,
    pub file_extension: String,
    pub image: String,
    pub command: CommandTemplate,
    /// Per-language timeout; the global default applies when unset.
    pub timeout_seconds: Option<u64>,
}

impl LanguageProfile {
    pub fn source_file_name(&self) -> String {
        format!("solution.{}", self.file_extension)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Read-only table of language profiles, populated once at startup.
///
/// Reads are lock-free: the table is never mutated after construction.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageRegistry {
    /// The built-in language table.
    pub fn builtin() -> Self {
        let profiles = vec![
            LanguageProfile {
                id: "python".to_string(),
                file_extension: "py".to_string(),
                image: "python:3.9-slim".to_string(),
                command: CommandTemplate::new(["python", SOURCE_PLACEHOLDER]),
                timeout_seconds: Some(10),
            },
            LanguageProfile {
                id: "javascript".to_string(),
                file_extension: "js".to_string(),
                image: "node:14-alpine".to_string(),
                command: CommandTemplate::new(["node", SOURCE_PLACEHOLDER]),
                timeout_seconds: Some(10),
            },
            LanguageProfile {
                id: "java".to_string(),
                file_extension: "java".to_string(),
                image: "openjdk:11-jdk-slim".to_string(),
                command: CommandTemplate::new(["java", SOURCE_PLACEHOLDER]),
                timeout_seconds: Some(15),
            },
            LanguageProfile {
                id: "cpp".to_string(),
                file_extension: "cpp".to_string(),
                image: "gcc:latest".to_string(),
                // The source path lands in its own positional-parameter slot
                // ($0), never spliced into the script text.
                command: CommandTemplate::new([
                    "sh",
                    "-c",
                    "g++ -O2 -o /tmp/program \"$0\" && /tmp/program",
                    SOURCE_PLACEHOLDER,
                ]),
                timeout_seconds: Some(10),
            },
        ];

        Self::from_profiles(profiles)
    }

    /// Build a registry from an explicit set of profiles.
    pub fn from_profiles<I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = LanguageProfile>,
    {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    /// The built-in table extended/overridden by externally supplied
    /// profiles, keyed by language id.
    pub fn with_overrides(overrides: HashMap<String, LanguageProfile>) -> Self {
        let mut registry = Self::builtin();
        for (id, mut profile) in overrides {
            profile.id = id.clone();
            registry.profiles.insert(id, profile);
        }
        registry
    }

    pub fn lookup(&self, language_id: &str) -> Option<&LanguageProfile> {
        self.profiles.get(language_id)
    }

    pub fn language_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_substitutes_placeholder_slot() {
        let template = CommandTemplate::new(["python", SOURCE_PLACEHOLDER]);
        assert_eq!(
            template.resolve("/code/solution.py"),
            vec!["python", "/code/solution.py"]
        );
    }

    #[test]
    fn test_resolve_appends_when_no_placeholder() {
        let template = CommandTemplate::new(["node"]);
        assert_eq!(
            template.resolve("/code/solution.js"),
            vec!["node", "/code/solution.js"]
        );
    }

    #[test]
    fn test_resolve_keeps_compile_script_intact() {
        let registry = LanguageRegistry::builtin();
        let cpp = registry.lookup("cpp").unwrap();
        let argv = cpp.command.resolve("/code/solution.cpp");

        // The script text carries no user-controlled path; the path occupies
        // its own argv slot.
        assert_eq!(argv[0], "sh");
        assert_eq!(argv[1], "-c");
        assert!(!argv[2].contains("/code/solution.cpp"));
        assert_eq!(argv[3], "/code/solution.cpp");
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = LanguageRegistry::builtin();
        let python = registry.lookup("python").unwrap();
        assert_eq!(python.file_extension, "py");
        assert_eq!(python.image, "python:3.9-slim");
        assert_eq!(python.source_file_name(), "solution.py");
        assert_eq!(python.timeout(), Some(Duration::from_secs(10)));

        assert!(registry.lookup("ruby").is_none());
    }

    #[test]
    fn test_overrides_extend_builtin_table() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "python".to_string(),
            LanguageProfile {
                id: String::new(),
                file_extension: "py".to_string(),
                image: "python:3.12-slim".to_string(),
                command: CommandTemplate::new(["python3", SOURCE_PLACEHOLDER]),
                timeout_seconds: Some(5),
            },
        );

        let registry = LanguageRegistry::with_overrides(overrides);
        let python = registry.lookup("python").unwrap();
        assert_eq!(python.id, "python");
        assert_eq!(python.image, "python:3.12-slim");
        // Untouched builtin entries survive.
        assert!(registry.lookup("cpp").is_some());
    }
}
