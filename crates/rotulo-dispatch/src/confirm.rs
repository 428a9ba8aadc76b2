// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confirmation notifier: tells the upstream sink a label was printed.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use rotulo_core::ConfirmOutcome;
use rotulo_core::error::{Result, RotuloError};

use crate::backoff::confirm_delay;

pub const CONFIRM_ATTEMPTS: u32 = 3;
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(3);

/// Seam between the orchestrator and the confirmation sink, so batch
/// tests can run without a network.
pub trait Confirmer: Send + Sync {
    /// Never fails outward: exhausted retries come back as an outcome
    /// flagged `impresso_sem_confirmacao`. The label is already on paper
    /// at this point, so a dead sink must not fail the job.
    fn confirm(&self, id_produto: &str) -> impl Future<Output = ConfirmOutcome> + Send;
}

/// HTTP confirmer posting `{"status": "concluido", "id_produto": ...}`.
/// Any 2xx response counts as confirmed.
pub struct HttpConfirmer {
    client: reqwest::Client,
    url: String,
}

impl HttpConfirmer {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CONFIRM_TIMEOUT)
            .build()
            .map_err(|e| RotuloError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post_once(&self, id_produto: &str) -> Result<Option<Value>> {
        let body = serde_json::json!({
            "status": "concluido",
            "id_produto": id_produto,
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RotuloError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| RotuloError::Http(e.to_string()))?;
        // the sink usually answers JSON, but a bare 200 is still a confirm
        Ok(resp.json().await.ok())
    }
}

impl Confirmer for HttpConfirmer {
    async fn confirm(&self, id_produto: &str) -> ConfirmOutcome {
        let mut attempt = 1;
        loop {
            match self.post_once(id_produto).await {
                Ok(data) => return ConfirmOutcome::ok(data),
                Err(e) if attempt >= CONFIRM_ATTEMPTS => {
                    warn!(
                        id_produto,
                        error = %e,
                        "confirmation exhausted, label printed without confirmation"
                    );
                    return ConfirmOutcome::unconfirmed(e.to_string());
                }
                Err(e) => {
                    debug!(id_produto, attempt, error = %e, "confirmation attempt failed");
                    tokio::time::sleep(confirm_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
