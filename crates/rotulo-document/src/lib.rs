// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotulo Document — the ZPL label template and the pure renderer that fills
// it from job attributes. No I/O lives here; everything is safe to call
// concurrently.

pub mod render;
pub mod template;

pub use render::{format_date_br, render_batch, render_label, split_name};
pub use template::{LABEL_TEMPLATE, fill_placeholders};
