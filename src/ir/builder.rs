//! Source scanner producing the run-length compressed IR.

use super::{Op, OpKind, Program, MAX_ARG};
use crate::core::{CompileError, CompileResult};

/// Scan `source` into a [`Program`].
///
/// Bytes other than the eight commands are skipped. Consecutive `>`, `<`,
/// `+` or `-` fold into the previous op until its argument reaches
/// [`MAX_ARG`], after which a fresh op starts. `.`, `,`, `[` and `]` always
/// start a new op.
///
/// A `]` with no open loop fails immediately. Loops still open at the end
/// fail with the offset of the outermost unclosed `[`. No IR is returned on
/// failure.
pub fn build(source: &[u8]) -> CompileResult<Program> {
    let mut ops: Vec<Op> = Vec::new();
    // Offsets of currently open brackets; its length is the nesting depth.
    let mut open_brackets: Vec<usize> = Vec::new();

    for (offset, &byte) in source.iter().enumerate() {
        let Some(kind) = OpKind::from_command(byte) else {
            continue;
        };

        match kind {
            OpKind::LoopOpen => {
                open_brackets
                    .try_reserve(1)
                    .map_err(|_| CompileError::ResourceExhausted { what: "bracket tracker" })?;
                open_brackets.push(offset);
            }
            OpKind::LoopClose => {
                if open_brackets.pop().is_none() {
                    log::debug!("unmatched ']' at byte {}", offset);
                    return Err(CompileError::UnmatchedCloseBracket { offset });
                }
            }
            _ => {}
        }

        if kind.is_repeatable() {
            if let Some(last) = ops.last_mut() {
                if last.kind == kind && last.arg < MAX_ARG {
                    last.arg += 1;
                    continue;
                }
            }
        }

        ops.try_reserve(1)
            .map_err(|_| CompileError::ResourceExhausted { what: "IR sequence" })?;
        ops.push(Op::new(kind, 1));
    }

    if let Some(&offset) = open_brackets.first() {
        log::debug!("{} loop(s) left open, first at byte {}", open_brackets.len(), offset);
        return Err(CompileError::UnmatchedOpenBracket { offset });
    }

    log::debug!("built {} ops from {} source bytes", ops.len(), source.len());
    Ok(Program::from_ops(ops))
}
