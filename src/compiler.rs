//! One-call compilation pipeline: source bytes to executable image.

use object::Architecture;

use crate::core::{CompileResult, CompileStats};
use crate::elf;
use crate::ir::{self, Program};
use crate::x64::{self, EmitOptions, EmittedCode, EofBehavior};

/// Default number of cells in the zero-initialized tape.
pub const DEFAULT_CELL_COUNT: u64 = 131_072;

/// The only architecture the backend targets.
pub const TARGET_ARCH: Architecture = Architecture::X86_64;

/// Settings for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Size of the tape in byte cells.
    pub cell_count: u64,
    /// Run the peephole pass.
    pub optimize: bool,
    pub eof: EofBehavior,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            cell_count: DEFAULT_CELL_COUNT,
            optimize: true,
            eof: EofBehavior::default(),
        }
    }
}

impl CompileOptions {
    fn emit_options(&self) -> EmitOptions {
        EmitOptions { eof: self.eof }
    }

    /// Empty statistics for a compilation under these options.
    pub fn new_stats(&self) -> CompileStats {
        CompileStats {
            cell_count: self.cell_count,
            ..Default::default()
        }
    }
}

/// Result of a full compilation.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub image: Vec<u8>,
    pub stats: CompileStats,
}

/// Build the IR and, if enabled, run the peephole pass.
pub fn build_ir(
    source: &[u8],
    options: &CompileOptions,
    stats: &mut CompileStats,
) -> CompileResult<Program> {
    let mut program = ir::build(source)?;
    stats.source_bytes = source.len();
    stats.ops_built = program.len();

    if options.optimize {
        let report = ir::optimize(&mut program);
        stats.zero_loops_elided = report.rewrites("zero-loop-elision");
    }
    Ok(program)
}

/// Build, optimize and emit, stopping before the link step.
pub fn lower(
    source: &[u8],
    options: &CompileOptions,
    stats: &mut CompileStats,
) -> CompileResult<(Program, EmittedCode)> {
    let program = build_ir(source, options, stats)?;
    let emitted = x64::emit(&program, &options.emit_options())?;
    emitted.record_stats(&program, stats);
    Ok((program, emitted))
}

/// Compile `source` to an ELF image, collecting statistics.
pub fn compile_with_stats(source: &[u8], options: &CompileOptions) -> CompileResult<Compilation> {
    let mut stats = options.new_stats();

    let (_, emitted) = lower(source, options, &mut stats)?;
    let EmittedCode { code, relocations, .. } = emitted;
    let image = elf::link(TARGET_ARCH, &code, &[], options.cell_count, &relocations)?;
    stats.image_size = image.len();

    log::info!(
        "compiled {} source bytes into a {} byte image",
        stats.source_bytes,
        stats.image_size
    );
    Ok(Compilation { image, stats })
}

/// Compile `source` to an ELF image.
pub fn compile(source: &[u8], options: &CompileOptions) -> CompileResult<Vec<u8>> {
    compile_with_stats(source, options).map(|compilation| compilation.image)
}
