// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime settings for the dispatch agent.
///
/// `Default` carries the production endpoints; `from_env` lets a deployment
/// override any of them without shipping a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Remote job feed polled for label batches.
    pub poll_url: String,
    /// Confirmation sink notified after each successful print.
    pub confirm_url: String,
    /// Printer directory file, watched for changes while running.
    pub printers_path: PathBuf,
    /// Directory receiving the daily NDJSON outcome logs.
    pub log_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_url: "https://stockflow.pro/start.php".into(),
            confirm_url: "https://stockflow.pro/status.php".into(),
            printers_path: PathBuf::from("config/printers.json"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AgentConfig {
    /// Build a config from the environment, falling back to defaults
    /// field by field.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            poll_url: std::env::var("LONG_POLL_URL").unwrap_or(base.poll_url),
            confirm_url: std::env::var("CONFIRM_URL").unwrap_or(base.confirm_url),
            printers_path: std::env::var("PRINTERS_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(base.printers_path),
            log_dir: std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.log_dir),
        }
    }
}
