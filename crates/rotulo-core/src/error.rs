// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Rotulo.

use thiserror::Error;

/// Top-level error type for all Rotulo operations.
#[derive(Debug, Error)]
pub enum RotuloError {
    // -- Job intake --
    #[error("malformed job batch: {0}")]
    MalformedBatch(String),

    #[error("job source request failed: {0}")]
    Source(String),

    /// Long-poll cycles end in a client timeout when no work arrives;
    /// the poll loop treats this as an ordinary empty cycle.
    #[error("job source poll timed out")]
    SourceTimeout,

    #[error("HTTP client error: {0}")]
    Http(String),

    // -- Delivery --
    #[error("raw socket delivery failed: {0}")]
    RawSocket(String),

    #[error("spool submission failed: {0}")]
    Spool(String),

    #[error("both delivery channels failed: {0}")]
    Delivery(String),

    // -- Dispatch --
    #[error("dispatch already running")]
    Busy,

    #[error("circuit breaker open, dispatch suspended")]
    BreakerOpen,

    // -- Printer directory --
    #[error("printer directory error: {0}")]
    Directory(String),

    #[error("directory watch error: {0}")]
    Watch(String),

    // -- IO / serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RotuloError>;
