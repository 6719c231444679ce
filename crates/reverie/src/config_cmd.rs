// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reverie config` command implementation.
//!
//! Configuration is loaded and validated before any command runs, so `check`
//! only reports success. `show` prints the resolved TOML.

use reverie_config::ReverieConfig;
use reverie_core::ReverieError;

use crate::ConfigAction;

const REDACTED: &str = "********";

pub fn run_config(config: &ReverieConfig, action: ConfigAction) -> Result<(), ReverieError> {
    match action {
        ConfigAction::Check => {
            println!(
                "configuration OK (backend: {}, journeys: {})",
                config.provider.backend,
                config.journeys.len()
            );
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", render(config)?);
            Ok(())
        }
    }
}

/// Resolved configuration as TOML with the API key masked.
fn render(config: &ReverieConfig) -> Result<String, ReverieError> {
    let mut shown = config.clone();
    if shown.provider.anthropic.api_key.is_some() {
        shown.provider.anthropic.api_key = Some(REDACTED.to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| ReverieError::Internal(format!("failed to render configuration: {e}")))
}
