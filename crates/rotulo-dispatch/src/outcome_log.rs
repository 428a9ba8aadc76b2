// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Append-only NDJSON audit trail of every job outcome.

use std::path::PathBuf;

use chrono::{Local, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::error;

use rotulo_core::error::Result;
use rotulo_core::{ConfirmOutcome, JobStatus, LabelJob, PrinterRecord};
use rotulo_print::CircuitState;

/// One line in the audit file. Field names are the upstream reporting
/// contract; downstream tooling greps these files, so they stay stable.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    pub timestamp: String,
    pub data: String,
    pub hora: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_key: Option<String>,
    pub nm_empresa: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_produto: Option<String>,
    pub nome_produto: String,
    pub quantidade: u32,
    pub impressora: String,
    pub status: JobStatus,
    pub mensagem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmacao_api: Option<ConfirmOutcome>,
    pub anydesk_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    pub circuit_breaker_state: String,
}

impl OutcomeRecord {
    pub fn printed(
        job: &LabelJob,
        printer: &PrinterRecord,
        mensagem: String,
        confirmacao: ConfirmOutcome,
        batch_size: usize,
        breaker: CircuitState,
    ) -> Self {
        Self::build(
            job,
            printer,
            JobStatus::Impresso,
            mensagem,
            Some(confirmacao),
            Some(batch_size),
            breaker,
        )
    }

    pub fn failed(
        job: &LabelJob,
        printer: &PrinterRecord,
        mensagem: String,
        breaker: CircuitState,
    ) -> Self {
        Self::build(job, printer, JobStatus::Erro, mensagem, None, None, breaker)
    }

    fn build(
        job: &LabelJob,
        printer: &PrinterRecord,
        status: JobStatus,
        mensagem: String,
        confirmacao_api: Option<ConfirmOutcome>,
        batch_size: Option<usize>,
        breaker: CircuitState,
    ) -> Self {
        let now = Local::now();
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data: now.format("%Y-%m-%d").to_string(),
            hora: now.format("%H:%M:%S").to_string(),
            store_key: job.store_key.clone(),
            nm_empresa: job.field_str("nm_empresa"),
            id_produto: job.id_produto.clone(),
            nome_produto: job.field_str("nome"),
            quantidade: job.etiquetas,
            impressora: printer.nome.clone(),
            status,
            mensagem,
            confirmacao_api,
            anydesk_id: printer
                .anydesk_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| "N/A".into()),
            batch_size,
            circuit_breaker_state: breaker.to_string(),
        }
    }
}

/// Daily-rotated NDJSON writer. Append failures are reported and
/// swallowed; losing an audit line must never fail the batch that
/// produced it.
pub struct OutcomeLog {
    dir: PathBuf,
}

impl OutcomeLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn append(&self, record: &OutcomeRecord) {
        if let Err(e) = self.try_append(record).await {
            error!(error = %e, "failed to append outcome record");
        }
    }

    async fn try_append(&self, record: &OutcomeRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name(Local::now().date_naive()));
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Path the next append will write to.
    pub fn current_file(&self) -> PathBuf {
        self.dir.join(file_name(Local::now().date_naive()))
    }
}

fn file_name(date: NaiveDate) -> String {
    format!("impressao_{}.ndjson", date.format("%Y%m%d"))
}
