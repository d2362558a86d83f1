// This module serves as the central hub for bfaot's shared infrastructure: the error taxonomy
// used by every pipeline stage, the backpatch stack the emitter uses to pair loop branches,
// the relocation records the emitter hands to the linker, and the statistics collected over
// one compilation. Nothing here depends on the IR or the target encoder; the only outside
// type is the linker's error, which CompileError wraps as a backend failure.

//! Core bfaot infrastructure.
//!
//! # Key Components
//!
//! - [`error`]: [`CompileError`] and the [`CompileResult`] alias
//! - [`patch_stack`]: growable LIFO of code offsets for branch backpatching
//! - [`reloc`]: [`Relocation`] records passed from the emitter to the linker
//! - [`stats`]: [`CompileStats`] gathered across the pipeline

pub mod error;
pub mod patch_stack;
pub mod reloc;
pub mod stats;

pub use error::{CompileError, CompileResult};
pub use patch_stack::PatchStack;
pub use reloc::{Relocation, RelocationKind};
pub use stats::CompileStats;
