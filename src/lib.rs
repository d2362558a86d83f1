//! bfaot - ahead-of-time brainfuck compiler for x86-64 Linux.
//!
//! Source text goes through three stages before it reaches the linker:
//! the IR builder folds runs of commands and checks bracket balance, a
//! peephole pass rewrites zero loops into stores, and the x86-64 emitter
//! produces machine code with loop branches resolved by backpatching. The
//! linker then wraps the code in a static ELF executable whose tape lives
//! in a demand-zeroed segment.
//!
//! # Primary Usage
//!
//! ```no_run
//! use bfaot::{compile, CompileOptions};
//!
//! let image = compile(b"++++++++[>++++++++<-]>+.", &CompileOptions::default())?;
//! std::fs::write("a.out", image)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - Op IR, builder, peephole optimizer and printer
//! - [`x64`] - x86-64 encoder, emitter and disassembly listings
//! - [`elf`] - ELF64 executable linker
//! - [`core`](crate::core) - Shared infrastructure (errors, patch stack, relocations, stats)
//! - [`compiler`] - The whole pipeline in one call

pub mod compiler;
pub mod core;
pub mod elf;
pub mod ir;
pub mod x64;

pub use compiler::{compile, compile_with_stats, CompileOptions, Compilation, DEFAULT_CELL_COUNT};
pub use self::core::{CompileError, CompileResult, CompileStats, Relocation, RelocationKind};
pub use elf::{link, LinkError};
pub use ir::{Op, OpKind, Program};
pub use x64::{EmitOptions, EmittedCode, EofBehavior};
