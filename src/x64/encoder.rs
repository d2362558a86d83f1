// This module provides the byte-level x86-64 instruction encodings used by the bfaot code
// emitter. X64Encoder owns the growing code buffer and exposes one method per machine
// instruction the generated programs need: pointer moves on rsi (inc/dec, imm8 and imm32
// add/sub forms), byte arithmetic and stores through [rsi], the write/read/exit syscall
// sequences built from the rbx = 0 and r12 = 1 constant registers, and the cmp/je/jne
// pairs used for loops. Every encoding is emitted as fixed bytes so sizes are known exactly,
// which the loop backpatching relies on. Buffer growth goes through try_reserve so an
// allocation failure comes back as CompileError::ResourceExhausted instead of aborting.

//! x86-64 instruction encoding.
//!
//! Register conventions for generated code:
//!
//! | Register | Role |
//! |---|---|
//! | `rsi` | cell pointer, also the buffer argument of read/write |
//! | `rbx` | constant 0 (`bh` is used for the zero compare) |
//! | `r12` | constant 1 |
//! | `rax`, `rdi`, `rdx` | syscall number and arguments |
//!
//! Syscalls clobber `rcx` and `r11` only, so the constants survive.

use crate::core::{CompileError, CompileResult};

/// Encoded length of `cmp bh, [rsi]`.
pub const CMP_CELL_LEN: usize = 2;
/// Encoded length of a near `jcc rel32`.
pub const JCC_REL32_LEN: usize = 6;
/// Encoded length of a loop open or loop close sequence.
pub const LOOP_BRANCH_LEN: usize = CMP_CELL_LEN + JCC_REL32_LEN;
/// Offset of the imm64 field inside `movabs rsi, imm64`.
pub const MOVABS_IMM_OFFSET: usize = 2;

/// Linux x86-64 syscall number for `exit`.
pub const SYS_EXIT: u8 = 60;

/// x86-64 instruction encoder writing into an owned code buffer.
#[derive(Debug, Default)]
pub struct X64Encoder {
    code: Vec<u8>,
}

impl X64Encoder {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    /// Current length of the code buffer.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }

    /// Append raw bytes, growing the buffer fallibly.
    fn emit(&mut self, bytes: &[u8]) -> CompileResult<()> {
        self.code
            .try_reserve(bytes.len())
            .map_err(|_| CompileError::ResourceExhausted { what: "code buffer" })?;
        self.code.extend_from_slice(bytes);
        Ok(())
    }

    // ==== PREAMBLE AND EPILOGUE ====

    /// Emit `movabs rsi, 0` and return the offset of the imm64 field.
    ///
    /// The zero immediate is a placeholder the linker overwrites.
    pub fn movabs_rsi_placeholder(&mut self) -> CompileResult<usize> {
        let start = self.position();
        self.emit(&[0x48, 0xBE, 0, 0, 0, 0, 0, 0, 0, 0])?;
        Ok(start + MOVABS_IMM_OFFSET)
    }

    /// Load the constant registers: `xor rbx, rbx; xor r12, r12; inc r12`.
    pub fn load_constants(&mut self) -> CompileResult<()> {
        self.emit(&[
            0x48, 0x31, 0xDB, // xor rbx, rbx
            0x4D, 0x31, 0xE4, // xor r12, r12
            0x49, 0xFF, 0xC4, // inc r12
        ])
    }

    /// `mov rax, 60; mov rdi, rbx; syscall` - exit with status 0.
    pub fn exit_success(&mut self) -> CompileResult<()> {
        self.emit(&[
            0x48, 0xC7, 0xC0, SYS_EXIT, 0x00, 0x00, 0x00, // mov rax, 60
            0x48, 0x89, 0xDF, // mov rdi, rbx
            0x0F, 0x05, // syscall
        ])
    }

    // ==== CELL POINTER ====

    /// Advance `rsi` by `count`, using the shortest encoding.
    pub fn add_rsi(&mut self, count: u8) -> CompileResult<()> {
        match count {
            1 => self.emit(&[0x48, 0xFF, 0xC6]),
            // imm8 is sign-extended, so only 0..=127 fits.
            2..=127 => self.emit(&[0x48, 0x83, 0xC6, count]),
            _ => self.emit(&[0x48, 0x81, 0xC6, count, 0x00, 0x00, 0x00]),
        }
    }

    /// Move `rsi` back by `count`, using the shortest encoding.
    pub fn sub_rsi(&mut self, count: u8) -> CompileResult<()> {
        match count {
            1 => self.emit(&[0x48, 0xFF, 0xCE]),
            2..=127 => self.emit(&[0x48, 0x83, 0xEE, count]),
            _ => self.emit(&[0x48, 0x81, 0xEE, count, 0x00, 0x00, 0x00]),
        }
    }

    // ==== CELL ARITHMETIC ====

    /// `inc byte [rsi]` or `add byte [rsi], imm8`. Wraps mod 256.
    pub fn add_cell(&mut self, amount: u8) -> CompileResult<()> {
        if amount == 1 {
            self.emit(&[0xFE, 0x06])
        } else {
            self.emit(&[0x80, 0x06, amount])
        }
    }

    /// `dec byte [rsi]` or `sub byte [rsi], imm8`. Wraps mod 256.
    pub fn sub_cell(&mut self, amount: u8) -> CompileResult<()> {
        if amount == 1 {
            self.emit(&[0xFE, 0x0E])
        } else {
            self.emit(&[0x80, 0x2E, amount])
        }
    }

    /// `mov byte [rsi], imm8`.
    pub fn store_cell(&mut self, value: u8) -> CompileResult<()> {
        self.emit(&[0xC6, 0x06, value])
    }

    // ==== I/O ====

    /// `write(1, rsi, 1)`.
    pub fn write_cell(&mut self) -> CompileResult<()> {
        self.emit(&[
            0x4C, 0x89, 0xE0, // mov rax, r12
            0x4C, 0x89, 0xE7, // mov rdi, r12
            0x4C, 0x89, 0xE2, // mov rdx, r12
            0x0F, 0x05, // syscall
        ])
    }

    /// `read(0, rsi, 1)`. A short read leaves the cell untouched.
    pub fn read_cell(&mut self) -> CompileResult<()> {
        self.emit(&[
            0x48, 0x89, 0xD8, // mov rax, rbx
            0x48, 0x89, 0xDF, // mov rdi, rbx
            0x4C, 0x89, 0xE2, // mov rdx, r12
            0x0F, 0x05, // syscall
        ])
    }

    // ==== CONTROL FLOW ====

    /// `cmp bh, [rsi]`, setting ZF when the cell is zero.
    pub fn cmp_cell_zero(&mut self) -> CompileResult<()> {
        self.emit(&[0x3A, 0x3E])
    }

    /// `je rel32`. Returns the offset just past the displacement field.
    pub fn je_rel32(&mut self, displacement: i32) -> CompileResult<usize> {
        self.emit(&[0x0F, 0x84])?;
        self.emit(&displacement.to_le_bytes())?;
        Ok(self.position())
    }

    /// `jne rel32`. Returns the offset just past the displacement field.
    pub fn jne_rel32(&mut self, displacement: i32) -> CompileResult<usize> {
        self.emit(&[0x0F, 0x85])?;
        self.emit(&displacement.to_le_bytes())?;
        Ok(self.position())
    }

    /// Overwrite the rel32 field ending at `field_end`.
    ///
    /// # Panics
    ///
    /// Panics if the field lies outside the code already emitted.
    pub fn patch_rel32(&mut self, field_end: usize, displacement: i32) {
        self.code[field_end - 4..field_end].copy_from_slice(&displacement.to_le_bytes());
    }
}

/// Displacement from `from` (end of the branch) to `target`.
pub fn rel32(from: usize, target: usize) -> CompileResult<i32> {
    let delta = target as i64 - from as i64;
    i32::try_from(delta).map_err(|_| CompileError::ResourceExhausted {
        what: "rel32 branch range",
    })
}
