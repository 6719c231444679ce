// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reverie serve` command implementation.
//!
//! Wires the runtime, serves the gateway until SIGINT/SIGTERM, then drains
//! background extraction before exiting.

use std::time::Duration;

use reverie_agent::{Reverie, shutdown};
use reverie_config::ReverieConfig;
use reverie_core::ReverieError;
use reverie_gateway::GatewayState;
use tracing::info;

/// How long shutdown waits for in-flight extraction.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_serve(config: ReverieConfig) -> Result<(), ReverieError> {
    if !config.gateway.enabled {
        return Err(ReverieError::Config(
            "the gateway is disabled; set [gateway] enabled = true or use `reverie chat`"
                .to_string(),
        ));
    }

    info!("starting reverie serve");
    let gateway_config = config.gateway.clone();
    let reverie = Reverie::build(config).await?;

    let cancel = shutdown::install_signal_handler();
    let state = GatewayState::new(&reverie);
    let served = reverie_gateway::serve(&gateway_config, state, cancel.clone()).await;

    // A failed bind still releases storage cleanly.
    cancel.cancel();
    reverie.shutdown(DRAIN_TIMEOUT).await?;
    served?;

    info!("reverie serve shutdown complete");
    Ok(())
}
