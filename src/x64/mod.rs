//! x86-64 architecture-specific components.
//!
//! This module contains all x86-64 specific code:
//! - Instruction encoding as fixed byte sequences
//! - Lowering of the op IR with loop backpatching
//! - Disassembly listings using iced-x86

pub mod disasm;
pub mod emitter;
pub mod encoder;

pub use emitter::{emit, EmitOptions, EmittedCode, EofBehavior};
pub use encoder::X64Encoder;
