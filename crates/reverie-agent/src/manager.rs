// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider manager: owns the active generation backend and rebuilds it when
//! relevant configuration changes.
//!
//! The active instance lives behind an [`ArcSwapOption`]. Callers take their
//! own `Arc` handle per call, so swapping in a new provider never disturbs
//! requests already in flight against the previous one.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reverie_anthropic::AnthropicProvider;
use reverie_config::model::{BackendKind, ProviderConfig};
use reverie_core::{ConnectionStatus, GenerateOptions, ProviderAdapter, ReverieError};
use reverie_ollama::OllamaProvider;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Builds a provider instance from the full provider configuration.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, ReverieError> + Send + Sync>;

/// Placeholder shown instead of a configured credential.
pub const REDACTED: &str = "********";

/// A partial provider configuration. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfigUpdate {
    pub backend: Option<BackendKind>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
    pub thinking_budget_tokens: Option<u32>,
    pub ollama_endpoint: Option<String>,
    pub ollama_model: Option<String>,
}

impl ProviderConfigUpdate {
    /// Returns `current` with every present field overwritten.
    pub fn apply(&self, current: &ProviderConfig) -> ProviderConfig {
        let mut next = current.clone();
        if let Some(backend) = self.backend {
            next.backend = backend;
        }
        if let Some(max_tokens) = self.max_tokens {
            next.max_tokens = max_tokens;
        }
        if self.temperature.is_some() {
            next.temperature = self.temperature;
        }
        if let Some(key) = &self.anthropic_api_key {
            next.anthropic.api_key = Some(key.clone()).filter(|k| !k.trim().is_empty());
        }
        if let Some(model) = &self.anthropic_model {
            next.anthropic.model = model.clone();
        }
        if self.thinking_budget_tokens.is_some() {
            next.anthropic.thinking_budget_tokens = self.thinking_budget_tokens;
        }
        if let Some(endpoint) = &self.ollama_endpoint {
            next.ollama.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.ollama_model {
            next.ollama.model = model.clone();
        }
        next
    }
}

/// True when `next` differs from `current` in a field the active backend is
/// built from. Generation options such as `max_tokens` never force a rebuild.
pub fn requires_rebuild(current: &ProviderConfig, next: &ProviderConfig) -> bool {
    if current.backend != next.backend {
        return true;
    }
    match next.backend {
        BackendKind::Ollama => current.ollama != next.ollama,
        BackendKind::Anthropic => current.anthropic != next.anthropic,
    }
}

/// Returns a copy safe to hand to a front end.
pub fn redact(config: &ProviderConfig) -> ProviderConfig {
    let mut redacted = config.clone();
    if redacted.anthropic.api_key.is_some() {
        redacted.anthropic.api_key = Some(REDACTED.to_string());
    }
    redacted
}

struct ActiveProvider {
    config: ProviderConfig,
    provider: Arc<dyn ProviderAdapter>,
}

/// Holds exactly one active provider plus its configuration.
pub struct ProviderManager {
    factories: HashMap<BackendKind, ProviderFactory>,
    active: ArcSwapOption<ActiveProvider>,
    /// Last requested configuration, kept even when building it failed.
    requested: Mutex<Option<ProviderConfig>>,
}

impl ProviderManager {
    /// A manager with no registered backends.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            active: ArcSwapOption::empty(),
            requested: Mutex::new(None),
        }
    }

    /// A manager with the Ollama and Anthropic backends registered.
    pub fn with_builtin_backends() -> Self {
        let mut manager = Self::new();
        manager.register(
            BackendKind::Ollama,
            Arc::new(|config: &ProviderConfig| {
                let provider: Arc<dyn ProviderAdapter> =
                    Arc::new(OllamaProvider::new(&config.ollama)?);
                Ok(provider)
            }),
        );
        manager.register(
            BackendKind::Anthropic,
            Arc::new(|config: &ProviderConfig| {
                let provider: Arc<dyn ProviderAdapter> =
                    Arc::new(AnthropicProvider::new(&config.anthropic)?);
                Ok(provider)
            }),
        );
        manager
    }

    /// Registers (or replaces) the factory for a backend kind.
    pub fn register(&mut self, kind: BackendKind, factory: ProviderFactory) {
        self.factories.insert(kind, factory);
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, ReverieError> {
        let factory =
            self.factories
                .get(&config.backend)
                .ok_or_else(|| ReverieError::AdapterNotFound {
                    adapter_type: "Provider".to_string(),
                    name: config.backend.to_string(),
                })?;
        let provider = factory(config)?;
        if !provider.is_configured() {
            return Err(ReverieError::Config(format!(
                "the {} backend is missing required settings",
                config.backend
            )));
        }
        Ok(provider)
    }

    /// Builds the provider for `config.backend` and makes it active.
    pub async fn initialize(&self, config: ProviderConfig) -> Result<(), ReverieError> {
        let mut requested = self.requested.lock().await;
        *requested = Some(config.clone());

        let provider = self.build(&config)?;
        info!(
            backend = %config.backend,
            provider = provider.name(),
            "provider initialized"
        );
        self.active
            .store(Some(Arc::new(ActiveProvider { config, provider })));
        Ok(())
    }

    /// Merges `update` into the current configuration.
    ///
    /// Rebuilds the provider only when a field relevant to the active backend
    /// changed. Returns `true` when a new instance was swapped in. On a build
    /// failure the previous provider and configuration stay in place.
    pub async fn update_config(&self, update: &ProviderConfigUpdate) -> Result<bool, ReverieError> {
        let mut requested = self.requested.lock().await;
        let active = self.active.load_full();

        let base = match (&active, requested.as_ref()) {
            (Some(active), _) => active.config.clone(),
            (None, Some(config)) => config.clone(),
            (None, None) => ProviderConfig::default(),
        };
        let next = update.apply(&base);

        match active {
            Some(active) if !requires_rebuild(&active.config, &next) => {
                debug!("provider config updated without rebuild");
                *requested = Some(next.clone());
                self.active.store(Some(Arc::new(ActiveProvider {
                    config: next,
                    provider: Arc::clone(&active.provider),
                })));
                Ok(false)
            }
            _ => {
                let provider = self.build(&next).inspect_err(|e| {
                    warn!(backend = %next.backend, error = %e, "provider rebuild failed");
                })?;
                info!(
                    backend = %next.backend,
                    provider = provider.name(),
                    "provider rebuilt"
                );
                *requested = Some(next.clone());
                self.active.store(Some(Arc::new(ActiveProvider {
                    config: next,
                    provider,
                })));
                Ok(true)
            }
        }
    }

    /// The active provider. Fails fast before a successful `initialize`.
    pub fn get_provider(&self) -> Result<Arc<dyn ProviderAdapter>, ReverieError> {
        self.active
            .load_full()
            .map(|active| Arc::clone(&active.provider))
            .ok_or_else(|| ReverieError::NotInitialized("provider manager".to_string()))
    }

    /// Generation options derived from the active configuration.
    pub fn generate_options(&self) -> GenerateOptions {
        match self.active.load_full() {
            Some(active) => GenerateOptions {
                max_tokens: active.config.max_tokens,
                temperature: active.config.temperature,
            },
            None => GenerateOptions::default(),
        }
    }

    /// Probes the active backend. Never fails.
    pub async fn status(&self) -> ConnectionStatus {
        match self.get_provider() {
            Ok(provider) => provider.test_connection().await,
            Err(e) => ConnectionStatus::failed(e.to_string()),
        }
    }

    /// Snapshot of the current configuration with the credential redacted.
    pub async fn config(&self) -> Option<ProviderConfig> {
        if let Some(active) = self.active.load_full() {
            return Some(redact(&active.config));
        }
        self.requested.lock().await.as_ref().map(redact)
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}
