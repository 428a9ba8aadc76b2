// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified dual-channel delivery: raw socket first, CUPS spool fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::{DispatchStats, PrinterRecord};

use crate::raw_client::{RAW_TIMEOUT, send_raw_with_timeout};
use crate::spool_client::SpoolClient;

/// Which channel carried a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Raw,
    Spool,
}

/// Outcome of one successful delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub channel: Channel,
    /// Summary carried into job results and outcome records.
    pub mensagem: String,
    pub elapsed: Duration,
}

/// Seam between dispatch logic and the physical channels, so the
/// orchestrator can run against a mock in tests.
pub trait DeliveryChannel: Send + Sync {
    fn deliver(
        &self,
        printer: &PrinterRecord,
        payload: &str,
        copies: u32,
    ) -> impl Future<Output = Result<DeliveryReport>> + Send;
}

/// Production delivery.
///
/// Tries the raw socket when the record carries an endpoint, then always
/// falls back to the spool; the attempt fails only when both channels
/// fail. Successful deliveries feed the time-to-print sample ring.
pub struct DualChannel {
    spool: SpoolClient,
    raw_timeout: Duration,
    stats: Arc<DispatchStats>,
}

impl DualChannel {
    pub fn new(stats: Arc<DispatchStats>) -> Self {
        Self {
            spool: SpoolClient::new(),
            raw_timeout: RAW_TIMEOUT,
            stats,
        }
    }

    /// Channel with a substitute spool client and raw deadline, for tests.
    pub fn with_spool(stats: Arc<DispatchStats>, spool: SpoolClient, raw_timeout: Duration) -> Self {
        Self {
            spool,
            raw_timeout,
            stats,
        }
    }
}

impl DeliveryChannel for DualChannel {
    async fn deliver(
        &self,
        printer: &PrinterRecord,
        payload: &str,
        copies: u32,
    ) -> Result<DeliveryReport> {
        let start = Instant::now();

        if let Some((ip, porta)) = printer.raw_endpoint() {
            match send_raw_with_timeout(ip, porta, payload.as_bytes(), self.raw_timeout).await {
                Ok(()) => {
                    let elapsed = start.elapsed();
                    self.stats.record_tti(elapsed);
                    return Ok(DeliveryReport {
                        channel: Channel::Raw,
                        mensagem: format!("raw socket delivered to {ip}:{porta}"),
                        elapsed,
                    });
                }
                Err(e) => {
                    warn!(
                        printer = %printer.nome,
                        error = %e,
                        "raw channel failed, falling back to spool"
                    );
                }
            }
        }

        match self.spool.submit(&printer.nome, payload, copies).await {
            Ok(()) => {
                let elapsed = start.elapsed();
                self.stats.record_tti(elapsed);
                Ok(DeliveryReport {
                    channel: Channel::Spool,
                    mensagem: format!("spooled to {} ({} copies)", printer.nome, copies),
                    elapsed,
                })
            }
            Err(e) => {
                self.stats.add_failure();
                Err(RotuloError::Delivery(e.to_string()))
            }
        }
    }
}
