// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for label rendering in the rotulo-document crate.
// Covers the single-label hot path and a typical printer-group batch.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use rotulo_core::LabelJob;
use rotulo_document::{render_batch, render_label};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn sample_job(id: u32) -> LabelJob {
    serde_json::from_value(json!({
        "store_key": "1-2",
        "id_produto": id.to_string(),
        "etiquetas": 2,
        "nome": "QUEIJO MINAS PADRAO MEIA CURA FATIADO EMBALADO A VACUO",
        "grupo": "FRIOS E LATICINIOS",
        "conservacao": "RESFRIADO -2 A 4C",
        "data_entrada": "2025-01-27 08:30:00",
        "validade": "2025-02-03 08:30:00",
        "peso": "0,350",
        "unidade_medida": "kg",
        "fornecedor": "LATICINIOS SERRA AZUL LTDA",
        "val_fornecedor": "2025-02-10",
        "fab_fornecedor": "2025-01-20",
        "nm_empresa": "RESTAURANTE BOM SABOR",
        "cnpj": "12.345.678/0001-90",
        "responsavel_entrada": "MARIA",
        "armazenado": "CAMARA FRIA 2"
    }))
    .unwrap()
}

/// Benchmark rendering one fully populated label, including the date
/// formatting and the two-line name split.
fn bench_render_label(c: &mut Criterion) {
    let job = sample_job(450);
    c.bench_function("render_label (full job)", |b| {
        b.iter(|| black_box(render_label(black_box(&job))));
    });
}

/// Benchmark a 10-job printer group, the common batch size when a store
/// reprints a shelf section.
fn bench_render_batch(c: &mut Criterion) {
    let jobs: Vec<LabelJob> = (0..10).map(sample_job).collect();
    c.bench_function("render_batch (10 jobs)", |b| {
        b.iter(|| black_box(render_batch(black_box(&jobs))));
    });
}

criterion_group!(benches, bench_render_label, bench_render_batch);
criterion_main!(benches);
