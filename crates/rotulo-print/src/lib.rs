// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotulo Print — the physical delivery layer: raw-socket and CUPS spool
// channels, the circuit breaker that guards them, and the printer
// directory with its file watcher.

pub mod breaker;
pub mod delivery;
pub mod directory;
pub mod raw_client;
pub mod spool_client;
pub mod watcher;

pub use breaker::{CircuitBreaker, CircuitState};
pub use delivery::{Channel, DeliveryChannel, DeliveryReport, DualChannel};
pub use directory::PrinterDirectory;
pub use spool_client::SpoolClient;
pub use watcher::DirectoryWatcher;
