//! Lowering of a [`Program`] to x86-64 machine code.
//!
//! The emitter makes a single forward pass. Loops are the only construct
//! that needs a target not yet known: `[` emits `je` with a zero
//! displacement and pushes the offset just past that field onto the
//! [`PatchStack`]. The matching `]` pops it, emits its own `jne` straight
//! back to that offset, and then fills in the pending `je` so it lands just
//! past the `jne`. Both ends of a loop are therefore final as soon as the
//! `]` is emitted.
//!
//! ```text
//! open:   cmp bh, [rsi]
//!         je  after_close      ; patched at `]`
//! body:   ...
//! close:  cmp bh, [rsi]
//!         jne body
//! after_close:
//! ```

use std::ops::Range;

use super::encoder::{rel32, X64Encoder, JCC_REL32_LEN};
use crate::core::{CompileError, CompileResult, CompileStats, PatchStack, Relocation};
use crate::ir::{Op, OpKind, Program};

/// What `,` stores when standard input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EofBehavior {
    /// Leave the cell as it was.
    #[default]
    Unchanged,
    /// Store 0.
    Zero,
}

/// Code generation settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    pub eof: EofBehavior,
}

/// Machine code and linker metadata for one program.
#[derive(Debug, Clone)]
pub struct EmittedCode {
    pub code: Vec<u8>,
    pub relocations: Vec<Relocation>,
    /// Byte range of each op's encoding, indexed like [`Program::ops`].
    /// Noops get an empty range.
    pub op_ranges: Vec<Range<usize>>,
    /// Bytes before the first op.
    pub preamble_len: usize,
    pub loops: usize,
    pub max_loop_depth: usize,
}

impl EmittedCode {
    /// Copy the code metrics into `stats`.
    pub fn record_stats(&self, program: &Program, stats: &mut CompileStats) {
        stats.code_size = self.code.len();
        stats.loops_compiled = self.loops;
        stats.max_loop_depth = self.max_loop_depth;
        for op in program.iter().filter(|op| op.kind != OpKind::Noop) {
            stats.record_op(op.kind.name());
        }
    }
}

/// Per-call emission state. Dropped on every return path, which releases
/// the patch stack.
struct Emitter {
    enc: X64Encoder,
    patches: PatchStack,
    options: EmitOptions,
    loops: usize,
    max_depth: usize,
}

impl Emitter {
    fn new(options: EmitOptions) -> CompileResult<Self> {
        Ok(Self {
            enc: X64Encoder::new(),
            patches: PatchStack::new()?,
            options,
            loops: 0,
            max_depth: 0,
        })
    }

    /// Load the cell pointer and the constant registers.
    fn preamble(&mut self) -> CompileResult<Relocation> {
        let field = self.enc.movabs_rsi_placeholder()?;
        self.enc.load_constants()?;
        Ok(Relocation::zero_region_base(field))
    }

    fn emit_op(&mut self, index: usize, op: Op) -> CompileResult<()> {
        match op.kind {
            OpKind::MoveRight => self.enc.add_rsi(op.arg),
            OpKind::MoveLeft => self.enc.sub_rsi(op.arg),
            OpKind::Increment => self.enc.add_cell(op.arg),
            OpKind::Decrement => self.enc.sub_cell(op.arg),
            OpKind::Output => self.enc.write_cell(),
            OpKind::Input => {
                if self.options.eof == EofBehavior::Zero {
                    self.enc.store_cell(0)?;
                }
                self.enc.read_cell()
            }
            OpKind::LoopOpen => self.loop_open(),
            OpKind::LoopClose => self.loop_close(index),
            OpKind::SetValue => self.enc.store_cell(op.arg),
            OpKind::Noop => Ok(()),
        }
    }

    fn loop_open(&mut self) -> CompileResult<()> {
        self.enc.cmp_cell_zero()?;
        let field_end = self.enc.je_rel32(0)?;
        self.patches.push(field_end)?;

        self.max_depth = self.max_depth.max(self.patches.len());
        Ok(())
    }

    fn loop_close(&mut self, index: usize) -> CompileResult<()> {
        let open_end = self.patches.pop().unwrap_or_else(|| {
            unreachable!("loop close at op {index} has no open loop; program was not validated")
        });

        self.enc.cmp_cell_zero()?;
        let close_end = self.enc.position() + JCC_REL32_LEN;
        let back = rel32(close_end, open_end)?;
        let emitted_end = self.enc.jne_rel32(back)?;
        debug_assert_eq!(emitted_end, close_end);

        let forward = rel32(open_end, close_end)?;
        self.enc.patch_rel32(open_end, forward);

        log::trace!(
            "loop resolved: open ends at {:#x}, close ends at {:#x}",
            open_end,
            close_end
        );
        self.loops += 1;
        Ok(())
    }
}

/// Emit machine code for `program`.
///
/// The result starts with a preamble that loads the cell pointer from a
/// placeholder, described by the single relocation returned, and ends with
/// an `exit(0)` syscall. Nothing is returned on failure.
pub fn emit(program: &Program, options: &EmitOptions) -> CompileResult<EmittedCode> {
    let mut emitter = Emitter::new(*options)?;

    let reloc = emitter.preamble()?;
    let preamble_len = emitter.enc.position();

    let mut op_ranges = Vec::new();
    op_ranges
        .try_reserve_exact(program.len())
        .map_err(|_| CompileError::ResourceExhausted { what: "op range table" })?;

    for (index, op) in program.iter().enumerate() {
        let start = emitter.enc.position();
        emitter.emit_op(index, *op)?;
        op_ranges.push(start..emitter.enc.position());
    }
    if let Some(open_end) = emitter.patches.top() {
        unreachable!("loop opened at code offset {open_end:#x} is never closed; program was not validated");
    }

    emitter.enc.exit_success()?;

    let Emitter { enc, loops, max_depth, .. } = emitter;
    let code = enc.into_code();
    log::debug!(
        "emitted {} bytes for {} ops ({} loops, max depth {})",
        code.len(),
        program.len(),
        loops,
        max_depth
    );

    Ok(EmittedCode {
        code,
        relocations: vec![reloc],
        op_ranges,
        preamble_len,
        loops,
        max_loop_depth: max_depth,
    })
}
