// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure label rendering: field formatting, name splitting, template fill,
// and copy-count handling. Takes a job by reference and never mutates it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::BTreeMap;

use rotulo_core::LabelJob;

use crate::template::{LABEL_TEMPLATE, fill_placeholders};

/// Attributes given the Brazilian date treatment before substitution.
const DATE_FIELDS: [&str; 4] = [
    "data_entrada",
    "validade",
    "val_fornecedor",
    "fab_fornecedor",
];

/// Character budget for the first name line.
const NAME_LINE_CHARS: usize = 36;
/// Word budget for the first name line once a split is needed.
const NAME_LINE_WORDS: usize = 6;
/// Names with at most this many words may stay on one line.
const NO_SPLIT_MAX_WORDS: usize = 7;

/// Normalize a date-like attribute to Brazilian display format
/// (`DD/MM/YYYY HH:MM`). Values that do not parse pass through unchanged.
pub fn format_date_br(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%d/%m/%Y %H:%M").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return format!("{} 00:00", d.format("%d/%m/%Y"));
    }
    raw.to_string()
}

/// Split an overlong product name across the template's two name lines.
///
/// Names of at most 7 words and 36 characters stay on line 1. Longer names
/// are packed greedily: a word lands on line 1 while that keeps the line
/// within 36 characters and 6 words, otherwise it goes to line 2. Every
/// word is tested independently, so a short word after an overflow can
/// still land on line 1 (upstream-compatible packing).
pub fn split_name(nome: &str) -> (String, String) {
    let palavras: Vec<&str> = nome.split(' ').collect();
    if palavras.len() <= NO_SPLIT_MAX_WORDS && nome.chars().count() <= NAME_LINE_CHARS {
        return (nome.to_string(), String::new());
    }

    let mut linha1 = String::new();
    let mut palavras_linha1 = 0usize;
    let mut linha2 = String::new();
    for palavra in palavras {
        let candidata = format!("{linha1} {palavra}");
        let candidata = candidata.trim();
        if candidata.chars().count() <= NAME_LINE_CHARS && palavras_linha1 < NAME_LINE_WORDS {
            linha1 = candidata.to_string();
            palavras_linha1 += 1;
        } else {
            linha2.push_str(palavra);
            linha2.push(' ');
        }
    }
    (linha1, linha2.trim().to_string())
}

/// Render one job into ZPL: format dates, compute the weight display
/// field, split the name, substitute placeholders, and apply the
/// copy-count directive.
pub fn render_label(job: &LabelJob) -> String {
    let mut fields = display_fields(job);

    for campo in DATE_FIELDS {
        let formatado = match fields.get(campo) {
            Some(valor) if !valor.is_empty() => Some(format_date_br(valor)),
            _ => None,
        };
        if let Some(valor) = formatado {
            fields.insert(campo.to_string(), valor);
        }
    }

    let peso = format!(
        "{}{}",
        job.field_str("peso"),
        job.field_str("unidade_medida")
    );
    fields.insert("peso_formatado".into(), peso.trim().to_string());

    let (nome, nome_2) = split_name(&job.field_str("nome"));
    fields.insert("nome".into(), nome);
    fields.insert("nome_2".into(), nome_2);

    apply_copies(fill_placeholders(LABEL_TEMPLATE, &fields), job.etiquetas)
}

/// Render every job in a group and concatenate into one batch payload,
/// preserving input order.
pub fn render_batch(jobs: &[LabelJob]) -> String {
    jobs.iter()
        .map(render_label)
        .collect::<Vec<_>>()
        .join("\n")
}

/// All substitutable attributes as display strings: the free-form fields
/// plus the typed routing fields, which the template also references.
fn display_fields(job: &LabelJob) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = job
        .campos
        .iter()
        .map(|(k, v)| (k.clone(), display_value(v)))
        .collect();
    if let Some(id) = &job.id_produto {
        fields.insert("id_produto".into(), id.clone());
    }
    if let Some(key) = &job.store_key {
        fields.insert("store_key".into(), key.clone());
    }
    fields.insert("etiquetas".into(), job.etiquetas.to_string());
    fields
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// The template prints one label; larger runs rewrite `^PQ` in place.
fn apply_copies(zpl: String, copies: u32) -> String {
    if copies > 1 {
        zpl.replacen("^PQ1,0,1,Y", &format!("^PQ{copies},0,1,Y"), 1)
    } else {
        zpl
    }
}
