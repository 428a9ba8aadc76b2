// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Rotulo label dispatch agent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One unit of label print work, as delivered by the remote job feed.
///
/// Only the routing fields are typed. Everything else the feed sends
/// (product name, group, dates, weights, company block) lands in `campos`
/// untouched and is consumed by the template renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelJob {
    /// Routing key selecting the target printer.
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub store_key: Option<String>,
    /// Item identifier, echoed to the confirmation sink.
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub id_produto: Option<String>,
    /// Requested copy count. The feed sends numbers or numeric strings;
    /// anything non-positive or unparseable coerces to 1.
    #[serde(default = "default_copies", deserialize_with = "de_copies")]
    pub etiquetas: u32,
    /// Free-form template attributes.
    #[serde(flatten)]
    pub campos: BTreeMap<String, Value>,
}

impl LabelJob {
    /// Attribute value rendered as display text; absent fields are empty.
    pub fn field_str(&self, key: &str) -> String {
        match self.campos.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Best-effort identifier for log lines and drop records.
    pub fn display_id(&self) -> String {
        if let Some(id) = &self.id_produto {
            return id.clone();
        }
        let fallback = self.field_str("id");
        if fallback.is_empty() {
            "?".into()
        } else {
            fallback
        }
    }

    /// A job is dispatchable only when both routing fields are present.
    pub fn is_dispatchable(&self) -> bool {
        self.store_key.as_deref().is_some_and(|s| !s.is_empty())
            && self.id_produto.as_deref().is_some_and(|s| !s.is_empty())
    }
}

fn default_copies() -> u32 {
    1
}

/// Serde helper for feeds that send strings and numbers interchangeably
/// in the same field. Anything else deserializes as absent.
pub fn de_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_copies<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_copies(value.as_ref()))
}

fn coerce_copies(value: Option<&Value>) -> u32 {
    let n = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(1),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(1),
        _ => 1,
    };
    if n < 1 { 1 } else { n as u32 }
}

/// Connection parameters for one physical printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterRecord {
    /// Display name; doubles as the CUPS queue name for spool delivery.
    #[serde(alias = "impressora")]
    pub nome: String,
    /// Network address for raw-socket delivery. Absent means spool-only.
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub ip: Option<String>,
    /// Raw-socket port. Directory normalization fills in 9100 when an
    /// address is present without a port.
    #[serde(default, deserialize_with = "de_port")]
    pub porta: Option<u16>,
    /// Inactive printers drop their jobs at grouping time.
    pub ativo: bool,
    /// Remote-access identifier carried into outcome records.
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub anydesk_id: Option<String>,
}

impl PrinterRecord {
    /// Raw-socket endpoint, when this printer has one.
    pub fn raw_endpoint(&self) -> Option<(&str, u16)> {
        match (self.ip.as_deref(), self.porta) {
            (Some(ip), Some(porta)) if !ip.is_empty() => Some((ip, porta)),
            _ => None,
        }
    }
}

/// Ports show up quoted in hand-edited directory files.
fn de_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
        _ => None,
    })
}

/// Terminal status of one job in a dispatch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Delivered to the printer, possibly via the fallback channel.
    Impresso,
    /// Both delivery channels failed.
    Erro,
    /// Dropped before delivery (routing, validation, or duplicate).
    Descartado,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Impresso => "impresso",
            Self::Erro => "erro",
            Self::Descartado => "descartado",
        })
    }
}

/// Why a job was dropped before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingRoutingFields,
    UnknownPrinter,
    InactivePrinter,
    Duplicate,
}

impl DropReason {
    /// Message carried into the job's result record.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingRoutingFields => "job is missing store_key or id_produto",
            Self::UnknownPrinter => "no printer configured for this routing key",
            Self::InactivePrinter => "printer is marked inactive",
            Self::Duplicate => "duplicate suppressed inside the dedup window",
        }
    }
}

/// Result of notifying the confirmation sink about one printed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub success: bool,
    /// Response payload from the sink, when it answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error from the final attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when every attempt failed: the label was printed but the sink
    /// was never told. Reconciled out-of-band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impresso_sem_confirmacao: Option<bool>,
}

impl ConfirmOutcome {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            impresso_sem_confirmacao: None,
        }
    }

    pub fn unconfirmed(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            impresso_sem_confirmacao: Some(true),
        }
    }
}

/// One entry in the ordered dispatch result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_key: Option<String>,
    pub status: JobStatus,
    pub mensagem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmacao_api: Option<ConfirmOutcome>,
}

impl JobResult {
    pub fn printed(job: &LabelJob, mensagem: String, confirmacao: Option<ConfirmOutcome>) -> Self {
        Self {
            id: job.id_produto.clone(),
            store_key: job.store_key.clone(),
            status: JobStatus::Impresso,
            mensagem,
            confirmacao_api: confirmacao,
        }
    }

    pub fn failed(job: &LabelJob, mensagem: String) -> Self {
        Self {
            id: job.id_produto.clone(),
            store_key: job.store_key.clone(),
            status: JobStatus::Erro,
            mensagem,
            confirmacao_api: None,
        }
    }

    pub fn dropped(job: &LabelJob, reason: DropReason) -> Self {
        Self {
            id: job.id_produto.clone(),
            store_key: job.store_key.clone(),
            status: JobStatus::Descartado,
            mensagem: reason.message().into(),
            confirmacao_api: None,
        }
    }
}
