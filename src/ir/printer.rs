//! Text listing of a [`Program`], used by `--emit ir`.

use std::fmt::Write;

use super::{OpKind, Program};

/// Render one op per line, prefixed by its index and indented by loop depth.
///
/// ```text
///     0  add 4
///     1  open
///     2    sub 1
///     3  close
/// ```
pub fn print(program: &Program) -> String {
    let mut out = String::new();
    let mut depth = 0usize;

    for (index, op) in program.iter().enumerate() {
        if op.kind == OpKind::LoopClose {
            depth = depth.saturating_sub(1);
        }
        let _ = writeln!(out, "{:>5}  {:indent$}{}", index, "", op, indent = depth * 2);
        if op.kind == OpKind::LoopOpen {
            depth += 1;
        }
    }

    out
}
