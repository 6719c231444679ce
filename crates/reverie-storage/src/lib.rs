// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Reverie journaling assistant.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! serialized connection via `tokio-rusqlite`, and typed operations for
//! conversations, messages, extractions, evidence, the narrative summary,
//! and guided onboarding state.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, map_tr_err};
