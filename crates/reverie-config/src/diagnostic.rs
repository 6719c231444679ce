// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment errors are mapped onto the layout of `reverie.toml`. An unknown key
//! is compared with the keys of its own section for a likely typo, then with
//! the other sections for a key written in the wrong place. Problems inside a
//! `[[journeys]]` entry get their own diagnostic naming the entry.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler similarity above which a key counts as a misspelling.
const TYPO_SIMILARITY: f64 = 0.8;

/// Every table of `reverie.toml` with the keys it accepts. The empty name is
/// the top level.
pub const SECTIONS: &[(&str, &[&str])] = &[
    (
        "",
        &[
            "agent", "provider", "storage", "context", "memory", "gateway", "journeys",
        ],
    ),
    ("agent", &["name", "log_level", "system_prompt"]),
    (
        "provider",
        &["backend", "max_tokens", "temperature", "anthropic", "ollama"],
    ),
    (
        "provider.anthropic",
        &["api_key", "model", "api_version", "thinking_budget_tokens"],
    ),
    ("provider.ollama", &["endpoint", "model"]),
    ("storage", &["database_path", "wal_mode"]),
    (
        "context",
        &["history_window", "retrieval_limit", "similarity_threshold"],
    ),
    (
        "memory",
        &[
            "enabled",
            "embedding_endpoint",
            "embedding_model",
            "dimension",
            "narrative_interval",
            "extraction_max_tokens",
        ],
    ),
    ("gateway", &["enabled", "host", "port"]),
    ("journeys", &["id", "title", "description", "system_prompt"]),
];

/// Keys accepted by `section`, if it is a known table.
pub fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// What an unknown key most likely meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyHint {
    /// A similarly spelled key of the same section.
    Typo(String),
    /// The key exists, but in this other section.
    Misplaced(String),
}

impl KeyHint {
    fn for_key(section: &str, key: &str, valid: &[&str]) -> Option<Self> {
        if let Some(close) = closest(key, valid) {
            return Some(Self::Typo(close.to_string()));
        }
        SECTIONS
            .iter()
            .find(|(name, keys)| !name.is_empty() && *name != section && keys.contains(&key))
            .map(|(name, _)| Self::Misplaced((*name).to_string()))
    }
}

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that its section does not accept.
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(reverie::config::unknown_key),
        help("{}", unknown_key_help(key, section, hint.as_ref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        section: String,
        hint: Option<KeyHint>,
        valid_keys: String,
        #[label("not accepted here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A top-level table Reverie does not know.
    #[error("unknown section `{name}`")]
    #[diagnostic(
        code(reverie::config::unknown_section),
        help("{}", unknown_section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        #[label("not a Reverie section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type.
    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(reverie::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required key outside `[[journeys]]` is missing.
    #[error("missing required key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(reverie::config::missing_key),
        help("add `{key} = <value>` under {}", section_label(section))
    )]
    MissingKey { key: String, section: String },

    /// A malformed `[[journeys]]` entry. `index` is zero-based.
    #[error("{}: {message}", journey_label(.index, .id))]
    #[diagnostic(
        code(reverie::config::journey),
        help("every [[journeys]] entry needs a unique `id`, a `title` and a `system_prompt`")
    )]
    Journey {
        index: Option<usize>,
        id: Option<String>,
        message: String,
    },

    /// A value parsed but failed semantic validation.
    #[error("validation error: {message}")]
    #[diagnostic(code(reverie::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(reverie::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn journey(index: usize, id: Option<&str>, message: impl Into<String>) -> Self {
        Self::Journey {
            index: Some(index),
            id: id.map(str::to_string),
            message: message.into(),
        }
    }
}

fn section_label(section: &str) -> String {
    match section {
        "" => "the top level".to_string(),
        "journeys" => "[[journeys]]".to_string(),
        other => format!("[{other}]"),
    }
}

fn journey_label(index: &Option<usize>, id: &Option<String>) -> String {
    let mut label = "[[journeys]] entry".to_string();
    if let Some(index) = index {
        label.push_str(&format!(" {}", index + 1));
    }
    if let Some(id) = id {
        label.push_str(&format!(" (`{id}`)"));
    }
    label
}

fn unknown_key_help(key: &str, section: &str, hint: Option<&KeyHint>, valid_keys: &str) -> String {
    match hint {
        Some(KeyHint::Typo(close)) => format!(
            "did you mean `{close}`? {} accepts: {valid_keys}",
            section_label(section)
        ),
        Some(KeyHint::Misplaced(home)) => {
            format!("`{key}` belongs under {}", section_label(home))
        }
        None => format!("{} accepts: {valid_keys}", section_label(section)),
    }
}

fn unknown_section_help(suggestion: Option<&str>) -> String {
    let sections = SECTIONS[0].1.join(", ");
    match suggestion {
        Some(name) => format!("did you mean `{name}`? Sections are: {sections}"),
        None => format!("sections are: {sections}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

/// Where in the document an error happened: the dotted table name without
/// array indices, plus the first array index seen.
struct Location {
    section: String,
    index: Option<usize>,
}

impl Location {
    fn of(error: &figment::Error) -> Self {
        let mut names = Vec::new();
        let mut index = None;
        for segment in &error.path {
            match segment.parse::<usize>() {
                Ok(i) => {
                    index.get_or_insert(i);
                }
                Err(_) => names.push(segment.as_str()),
            }
        }
        Self {
            section: names.join("."),
            index,
        }
    }
}

fn convert(error: &figment::Error, sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    let location = Location::of(error);
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let valid: Vec<&str> = expected.to_vec();
            let hint = KeyHint::for_key(&location.section, field, &valid);
            if location.section.is_empty() && !matches!(hint, Some(KeyHint::Misplaced(_))) {
                let (span, src) = locate(error, sources, |content| {
                    find_header_offset(content, field)
                });
                return ConfigError::UnknownSection {
                    name: field.clone(),
                    suggestion: closest(field, &valid).map(str::to_string),
                    span: span.map(|offset| SourceSpan::new(offset.into(), field.len())),
                    src,
                };
            }
            let (span, src) = locate(error, sources, |content| {
                find_key_offset(content, &location.section, location.index, field)
            });
            ConfigError::UnknownKey {
                key: field.clone(),
                section: location.section,
                hint,
                valid_keys: valid.join(", "),
                span: span.map(|offset| SourceSpan::new(offset.into(), field.len())),
                src,
            }
        }
        Kind::MissingField(field) if location.section == "journeys" => ConfigError::Journey {
            index: location.index,
            id: None,
            message: format!("missing `{field}`"),
        },
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.to_string(),
            section: location.section,
        },
        Kind::InvalidType(actual, expected) => {
            // The path ends with the offending key itself.
            let (section, field) = match location.section.rsplit_once('.') {
                Some((section, field)) => (section.to_string(), field.to_string()),
                None => (String::new(), location.section.clone()),
            };
            let (span, src) = locate(error, sources, |content| {
                find_key_offset(content, &section, location.index, &field)
            });
            ConfigError::InvalidType {
                key: location.section.clone(),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span: span.map(|offset| SourceSpan::new(offset.into(), field.len())),
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Finds the TOML text an error came from and runs `find` over it. Errors
/// without file metadata are attributed to the only source when there is one.
fn locate(
    error: &figment::Error,
    sources: &[(String, String)],
    find: impl Fn(&str) -> Option<usize>,
) -> (Option<usize>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match file {
        Some(path) => sources.iter().find(|(p, _)| *p == path),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };
    let Some((path, content)) = source else {
        return (None, None);
    };

    match find(content) {
        Some(offset) => (
            Some(offset),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset just past the header that opens `section`. Array tables are
/// counted so `index` picks the right `[[section]]` entry.
fn section_start(content: &str, section: &str, index: Option<usize>) -> Option<usize> {
    if section.is_empty() {
        return Some(0);
    }
    let table = format!("[{section}]");
    let array = format!("[[{section}]]");
    let wanted = index.unwrap_or(0);

    let mut seen = 0;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == table {
            return Some(offset + line.len());
        }
        if trimmed == array {
            if seen == wanted {
                return Some(offset + line.len());
            }
            seen += 1;
        }
        offset += line.len();
    }
    None
}

/// Byte offset of `field` inside `section`. The search stops at the next
/// table header so a key of the same name elsewhere is never reported.
pub fn find_key_offset(
    content: &str,
    section: &str,
    index: Option<usize>,
    field: &str,
) -> Option<usize> {
    let start = section_start(content, section, index)?;

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            return None;
        }
        if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

/// Byte offset of `name` in the first header that opens it, as a table, an
/// array table or the parent of a dotted table.
pub fn find_header_offset(content: &str, name: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let brackets = trimmed.len() - trimmed.trim_start_matches('[').len();
        if brackets > 0 {
            let rest = &trimmed[brackets..];
            if let Some(after) = rest.strip_prefix(name)
                && (after.starts_with(']') || after.starts_with('.'))
            {
                return Some(offset + line.len() - trimmed.len() + brackets);
            }
        }
        offset += line.len();
    }
    None
}

fn closest<'a>(candidate: &str, options: &[&'a str]) -> Option<&'a str> {
    options
        .iter()
        .map(|option| (strsim::jaro_winkler(candidate, option), *option))
        .filter(|(score, _)| *score > TYPO_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, option)| option)
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
