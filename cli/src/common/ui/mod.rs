//! # mdbdeploy UI Utilities (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! Plain-text presentation helpers for command output. Tables are drawn by
//! `comfy-table` with no borders; each column is padded to its widest cell,
//! as in `mdbdeploy list`:
//!
//! ```text
//! NAME         TYPE    MDB VER   STATE
//! local1234    LOCAL   8.0.4     IDLE
//! Cluster0     ATLAS   8.0.3     PAUSED
//! ```
//!

use comfy_table::presets::NOTHING;
use comfy_table::Table;

const COLUMN_GAP: u16 = 3;

/// Renders `rows` under `headers` as an aligned table, one line per row.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_header(headers.to_vec())
        .add_rows(rows.to_vec());
    for column in table.column_iter_mut() {
        column.set_padding((0, COLUMN_GAP));
    }

    let mut out = String::new();
    for line in table.to_string().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
