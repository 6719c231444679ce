// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP, SSE and WebSocket gateway for Reverie.
//!
//! Every route delegates to the [`reverie_agent::TurnOrchestrator`] or the
//! [`reverie_agent::ProviderManager`]; the gateway holds no state of its own
//! beyond shared handles. Errors leave as JSON `{"error": "..."}` bodies with
//! a status derived from the [`reverie_core::ReverieError`] variant.

pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;
pub mod ws;

pub use error::ApiError;
pub use server::{GatewayState, router, serve};
