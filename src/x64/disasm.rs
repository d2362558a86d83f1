//! Assembly listings of emitted code, decoded with iced-x86.

use std::fmt::Write;

use iced_x86::{Decoder, DecoderOptions, Formatter, Instruction, NasmFormatter};

use super::emitter::EmittedCode;
use crate::ir::Program;

/// Disassemble `code` as if loaded at `base`, one instruction per line.
pub fn listing(code: &[u8], base: u64) -> String {
    let mut out = String::new();
    append_range(&mut out, code, base, 0..code.len());
    out
}

/// Listing of a whole program with each op's instructions under a
/// `; index: op` header. Noops are listed with no instructions.
pub fn annotated_listing(program: &Program, emitted: &EmittedCode, base: u64) -> String {
    let code = &emitted.code;
    let mut out = String::new();

    out.push_str("; preamble\n");
    append_range(&mut out, code, base, 0..emitted.preamble_len);

    let mut body_end = emitted.preamble_len;
    for (index, (op, range)) in program.iter().zip(&emitted.op_ranges).enumerate() {
        let _ = writeln!(out, "; {}: {}", index, op);
        append_range(&mut out, code, base, range.clone());
        body_end = range.end;
    }

    out.push_str("; epilogue\n");
    append_range(&mut out, code, base, body_end..code.len());
    out
}

fn append_range(out: &mut String, code: &[u8], base: u64, range: std::ops::Range<usize>) {
    let start = range.start;
    let bytes = &code[range];
    let mut decoder = Decoder::with_ip(64, bytes, base + start as u64, DecoderOptions::NONE);
    let mut formatter = NasmFormatter::new();
    let mut instruction = Instruction::default();
    let mut text = String::new();

    while decoder.can_decode() {
        decoder.decode_out(&mut instruction);
        text.clear();
        formatter.format(&instruction, &mut text);

        let offset = (instruction.ip() - base) as usize;
        let mut hex = String::new();
        for byte in &code[offset..offset + instruction.len()] {
            let _ = write!(hex, "{:02X}", byte);
        }
        let _ = writeln!(out, "{:016X} {:<20} {}", instruction.ip(), hex, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{build, optimize};
    use crate::x64::{emit, EmitOptions};

    #[test]
    fn test_listing_mnemonics() {
        let code = [0x48, 0xFF, 0xC6, 0xFE, 0x0E, 0x0F, 0x05];
        let text = listing(&code, 0x1000);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0000000000001000 48FFC6"));
        assert!(lines[0].ends_with("inc rsi"));
        assert!(lines[1].contains("dec byte [rsi]"));
        assert!(lines[2].ends_with("syscall"));
    }

    #[test]
    fn test_annotated_listing_sections() {
        let mut program = build(b"+[-].").unwrap();
        optimize(&mut program);
        let emitted = emit(&program, &EmitOptions::default()).unwrap();
        let text = annotated_listing(&program, &emitted, 0);

        assert!(text.starts_with("; preamble\n"));
        assert!(text.contains("; 0: add 1\n"));
        assert!(text.contains("; 1: set 0\n"));
        assert!(text.contains("; 2: noop\n"));
        assert!(text.contains("; 4: out\n"));
        assert!(text.contains("mov byte [rsi],0"));
        assert!(text.contains("; epilogue\n"));
        assert!(text.trim_end().ends_with("syscall"));
    }
}
