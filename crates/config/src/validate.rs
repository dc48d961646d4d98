//! Configuration validation.
//!
//! Detects syntax errors, unknown or misspelled fields, type errors and
//! settings that contradict each other.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::schema::MaskSmithConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "crypto.verify_max_byte"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Expected shape of the configuration.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

/// Mirrors every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        ("storage", Struct(HashMap::from([("path", Leaf)]))),
        (
            "crypto",
            Struct(HashMap::from([
                ("verify_after_encrypt", Leaf),
                ("verify_max_bytes", Leaf),
            ])),
        ),
        (
            "prompt",
            Struct(HashMap::from([("offer_last_password", Leaf)])),
        ),
    ]))
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

/// Validate a config file at the given path, or the discovered one if `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let mut result = match crate::loader::load_config_value(&actual_path) {
        Ok(value) => validate_value(&value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to parse config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate TOML text without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    match crate::loader::parse_config_value(toml_str, Path::new("masksmith.toml")) {
        Ok(value) => validate_value(&value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            }],
            config_path: None,
        },
    }
}

/// Validate an already-parsed config tree.
#[must_use]
pub fn validate_value(value: &serde_json::Value) -> ValidationResult {
    let mut diagnostics = Vec::new();

    check_unknown_fields(value, &build_schema_map(), "", &mut diagnostics);

    match serde_json::from_value::<MaskSmithConfig>(value.clone()) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        // Leaf or type mismatch; type errors are caught by deserialization.
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }

        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message: msg.trim().to_string(),
        });
    }
}

fn check_semantic_warnings(config: &MaskSmithConfig, diagnostics: &mut Vec<Diagnostic>) {
    if !config.crypto.verify_after_encrypt {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "crypto.verify_after_encrypt".into(),
            message: "tokens are handed out without being decrypted once first".into(),
        });
        if config.crypto.verify_max_bytes.is_some() {
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                category: "semantic",
                path: "crypto.verify_max_bytes".into(),
                message: "ignored while verify_after_encrypt is false".into(),
            });
        }
    } else if config.crypto.verify_max_bytes == Some(0) {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "semantic",
            path: "crypto.verify_max_bytes".into(),
            message: "0 only verifies empty plaintexts".into(),
        });
    }

    if let Some(path) = &config.storage.path {
        if path.is_dir() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "file-ref",
                path: "storage.path".into(),
                message: format!("{} is a directory", path.display()),
            });
        } else if path.is_relative() {
            diagnostics.push(Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: "storage.path".into(),
                message: "relative path resolves against the working directory".into(),
            });
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("hello", "hello", 0)]
    #[case("", "abc", 3)]
    #[case("abc", "", 3)]
    #[case("crypto", "crypt", 1)]
    #[case("storage", "storag3", 1)]
    #[case("prompt", "propmt", 2)]
    fn levenshtein_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn empty_config_is_valid() {
        let result = validate_toml_str("");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn full_valid_config_no_diagnostics() {
        let toml = r#"
[storage]
path = "/var/lib/masksmith/secrets.db"

[crypto]
verify_after_encrypt = true
verify_max_bytes = 1048576

[prompt]
offer_last_password = false
"#;
        let result = validate_toml_str(toml);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_toml_str("[cyrpto]\nverify_after_encrypt = true\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field" && d.path == "cyrpto")
            .expect("unknown-field diagnostic for 'cyrpto'");
        assert_eq!(d.severity, Severity::Error);
        assert!(d.message.contains("crypto"), "{}", d.message);
    }

    #[test]
    fn unknown_nested_key_with_suggestion() {
        let result = validate_toml_str("[crypto]\nverify_max_byte = 10\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.path == "crypto.verify_max_byte")
            .expect("unknown-field diagnostic");
        assert!(d.message.contains("verify_max_bytes"));
    }

    #[test]
    fn unknown_key_without_close_match() {
        let result = validate_toml_str("[prompt]\ncolour = \"blue\"\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.path == "prompt.colour")
            .unwrap();
        assert_eq!(d.message, "unknown field");
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("[crypto\n");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_detected() {
        let result = validate_toml_str("[crypto]\nverify_after_encrypt = \"yes\"\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn disabled_verification_warned() {
        let result = validate_toml_str(
            "[crypto]\nverify_after_encrypt = false\nverify_max_bytes = 100\n",
        );
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(result.count(Severity::Info), 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn zero_limit_warned() {
        let result = validate_toml_str("[crypto]\nverify_max_bytes = 0\n");
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn store_path_that_is_a_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let value = serde_json::json!({ "storage": { "path": dir.path() } });
        let result = validate_value(&value);
        assert!(result.has_errors());
    }

    #[test]
    fn validates_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masksmith.yaml");
        std::fs::write(&path, "prompt:\n  offer_last_pasword: true\n").unwrap();

        let result = validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.path == "prompt.offer_last_pasword")
            .unwrap();
        assert!(d.message.contains("offer_last_password"));
    }

    #[test]
    fn unreadable_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(Some(&dir.path().join("missing.toml")));
        assert!(result.has_errors());
    }
}
