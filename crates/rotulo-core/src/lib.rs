// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotulo — Core types, errors, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod stats;
pub mod types;

pub use config::AgentConfig;
pub use error::RotuloError;
pub use stats::{DispatchStats, StatsSnapshot};
pub use types::*;
