// This module tracks per-compilation statistics for bfaot. CompileStats is filled in as the
// pipeline runs: the IR builder reports how many source bytes it scanned and how many
// operations it produced, the peephole pass reports how many zero loops it rewrote, the
// emitter reports the encoded code size, loop count, maximum nesting depth and a breakdown of
// emitted operations by kind, and the linker reports the final image size. The Display
// implementation renders a short human-readable summary used by the --stats flag.

//! Compilation statistics.

use std::collections::HashMap;
use std::fmt;

/// Compilation statistics.
#[derive(Debug, Default, Clone)]
pub struct CompileStats {
    /// Bytes of source text scanned.
    pub source_bytes: usize,

    /// Operations produced by the IR builder.
    pub ops_built: usize,

    /// Zero loops rewritten into a direct store.
    pub zero_loops_elided: usize,

    /// Operations that produced machine code (Noop excluded).
    pub ops_emitted: usize,

    /// Count of each operation kind emitted.
    pub op_counts: HashMap<&'static str, usize>,

    /// Loops compiled into a branch pair.
    pub loops_compiled: usize,

    /// Deepest loop nesting seen by the emitter.
    pub max_loop_depth: usize,

    /// Bytes of machine code, preamble and epilogue included.
    pub code_size: usize,

    /// Size of the linked ELF image.
    pub image_size: usize,

    /// Size of the zero-initialized cell region.
    pub cell_count: u64,
}

impl CompileStats {
    /// Record one emitted operation.
    pub fn record_op(&mut self, name: &'static str) {
        self.ops_emitted += 1;
        *self.op_counts.entry(name).or_insert(0) += 1;
    }
}

impl fmt::Display for CompileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Statistics:")?;
        writeln!(f, "  Source bytes: {}", self.source_bytes)?;
        writeln!(f, "  Operations built: {}", self.ops_built)?;
        writeln!(f, "  Zero loops elided: {}", self.zero_loops_elided)?;
        writeln!(f, "  Operations emitted: {}", self.ops_emitted)?;
        writeln!(f, "  Loops compiled: {}", self.loops_compiled)?;
        writeln!(f, "  Max loop depth: {}", self.max_loop_depth)?;
        writeln!(f, "  Code size: {} bytes", self.code_size)?;
        writeln!(f, "  Image size: {} bytes", self.image_size)?;
        writeln!(f, "  Cells: {}", self.cell_count)?;

        if !self.op_counts.is_empty() {
            writeln!(f, "  Operation breakdown:")?;
            let mut sorted: Vec<_> = self.op_counts.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

            for (name, count) in sorted {
                writeln!(f, "    {}: {}", name, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_op() {
        let mut stats = CompileStats::default();
        stats.record_op("add");
        stats.record_op("out");
        stats.record_op("add");

        assert_eq!(stats.ops_emitted, 3);
        assert_eq!(stats.op_counts["add"], 2);
        assert_eq!(stats.op_counts["out"], 1);
    }

    #[test]
    fn test_statistics_display() {
        let mut stats = CompileStats {
            source_bytes: 12,
            code_size: 64,
            ..Default::default()
        };
        stats.record_op("right");
        stats.record_op("right");
        stats.record_op("set");

        let output = format!("{}", stats);
        assert!(output.contains("Source bytes: 12"));
        assert!(output.contains("Code size: 64 bytes"));
        assert!(output.contains("Operations emitted: 3"));

        // Breakdown is ordered by count, highest first.
        let right = output.find("right: 2").unwrap();
        let set = output.find("set: 1").unwrap();
        assert!(right < set);
    }
}
