// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./reverie.toml` > `~/.config/reverie/reverie.toml` > `/etc/reverie/reverie.toml`
//! with environment variable overrides via `REVERIE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ReverieConfig;

/// Env var sections, longest first so nested sections win over their parents.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("provider_anthropic_", "provider.anthropic."),
    ("provider_ollama_", "provider.ollama."),
    ("provider_", "provider."),
    ("agent_", "agent."),
    ("storage_", "storage."),
    ("context_", "context."),
    ("memory_", "memory."),
    ("gateway_", "gateway."),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/reverie/reverie.toml` (system-wide)
/// 3. `~/.config/reverie/reverie.toml` (user XDG config)
/// 4. `./reverie.toml` (local directory)
/// 5. `REVERIE_*` environment variables
pub fn load_config() -> Result<ReverieConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ReverieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReverieConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ReverieConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReverieConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ReverieConfig::default()))
        .merge(Toml::file("/etc/reverie/reverie.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("reverie/reverie.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("reverie.toml"))
        .merge(env_provider())
}

/// Maps an env var name (lowercased, prefix stripped) to a dotted config key.
///
/// Only the leading section is split, so `provider_anthropic_api_key` becomes
/// `provider.anthropic.api_key`, never `provider.anthropic.api.key`.
pub fn map_env_key(key: &str) -> String {
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("REVERIE_").map(|key| map_env_key(key.as_str()).into())
}
