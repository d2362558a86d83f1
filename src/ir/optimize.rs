//! Peephole rewrites over the op sequence.
//!
//! Rules rewrite ops in place and never change the sequence length, so a
//! rewritten position becomes [`OpKind::Noop`] rather than disappearing.
//! Each rule runs as its own single pass and must be idempotent.
//!
//! A pass works on a scratch copy of the ops. Its result replaces the
//! program only if loop brackets still pair up; otherwise the pass is
//! dropped and listed in [`OptimizeReport::rejected`].

use super::{brackets_balanced, Op, OpKind, Program};

/// A local pattern rewrite applied in one pass over the ops.
pub trait PeepholeRule {
    /// Rewrite matches in place and return how many were rewritten.
    fn apply(&self, ops: &mut [Op]) -> usize;

    fn name(&self) -> &'static str;
}

/// `[-]` and `[+]` become `set 0, noop, noop`.
///
/// A loop whose body only adds or subtracts a constant can only exit once
/// the cell is zero, so the whole loop is a store of 0.
pub struct ZeroLoopElision;

impl PeepholeRule for ZeroLoopElision {
    fn apply(&self, ops: &mut [Op]) -> usize {
        let mut rewrites = 0;

        for i in 2..ops.len() {
            if ops[i].kind != OpKind::LoopClose {
                continue;
            }
            let step = ops[i - 1].kind;
            if ops[i - 2].kind == OpKind::LoopOpen
                && matches!(step, OpKind::Increment | OpKind::Decrement)
            {
                ops[i - 2] = Op::new(OpKind::SetValue, 0);
                ops[i - 1].kind = OpKind::Noop;
                ops[i].kind = OpKind::Noop;
                rewrites += 1;
            }
        }

        rewrites
    }

    fn name(&self) -> &'static str {
        "zero-loop-elision"
    }
}

/// Rewrite counts per rule from one optimizer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    pub passes: Vec<(&'static str, usize)>,
    /// Rules whose output unbalanced the loop brackets and was discarded.
    pub rejected: Vec<&'static str>,
}

impl OptimizeReport {
    /// Total rewrites across all rules.
    pub fn total(&self) -> usize {
        self.passes.iter().map(|(_, count)| count).sum()
    }

    /// Rewrites made by the named rule, zero if it did not run.
    pub fn rewrites(&self, rule: &str) -> usize {
        self.passes
            .iter()
            .find(|(name, _)| *name == rule)
            .map_or(0, |(_, count)| *count)
    }
}

/// Run the default rule set over `program`.
pub fn optimize(program: &mut Program) -> OptimizeReport {
    optimize_with(program, &[&ZeroLoopElision])
}

/// Run `rules` in order, one pass each.
pub fn optimize_with(program: &mut Program, rules: &[&dyn PeepholeRule]) -> OptimizeReport {
    let mut report = OptimizeReport::default();

    for rule in rules {
        let mut scratch = program.ops().to_vec();
        let count = rule.apply(&mut scratch);

        if !brackets_balanced(&scratch) {
            log::warn!("{}: output has unbalanced loops, pass discarded", rule.name());
            report.passes.push((rule.name(), 0));
            report.rejected.push(rule.name());
            continue;
        }

        program.ops_mut().copy_from_slice(&scratch);
        log::debug!("{}: {} rewrite(s)", rule.name(), count);
        report.passes.push((rule.name(), count));
    }

    log::debug!("{} of {} ops live after optimization", program.live_len(), program.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::build;

    fn optimized(source: &[u8]) -> Program {
        let mut program = build(source).unwrap();
        optimize(&mut program);
        program
    }

    #[test]
    fn test_zero_loop_decrement() {
        let program = optimized(b"[-]");
        assert_eq!(
            program.ops(),
            &[
                Op::new(OpKind::SetValue, 0),
                Op::new(OpKind::Noop, 1),
                Op::new(OpKind::Noop, 1),
            ]
        );
    }

    #[test]
    fn test_zero_loop_increment() {
        let program = optimized(b"[+]");
        let kinds: Vec<_> = program.iter().map(|op| op.kind).collect();
        assert_eq!(kinds, vec![OpKind::SetValue, OpKind::Noop, OpKind::Noop]);
        assert_eq!(program.ops()[0].arg, 0);
    }

    #[test]
    fn test_zero_loop_any_step() {
        let program = optimized(b"[---]");
        assert_eq!(program.ops()[0], Op::new(OpKind::SetValue, 0));
        assert_eq!(program.live_len(), 1);
    }

    #[test]
    fn test_length_preserved() {
        let before = build(b"++++[-]++").unwrap();
        let mut after = before.clone();
        let report = optimize(&mut after);

        assert_eq!(before.len(), after.len());
        assert_eq!(report.rewrites("zero-loop-elision"), 1);
        assert_eq!(
            after.ops(),
            &[
                Op::new(OpKind::Increment, 4),
                Op::new(OpKind::SetValue, 0),
                Op::new(OpKind::Noop, 1),
                Op::new(OpKind::Noop, 1),
                Op::new(OpKind::Increment, 2),
            ]
        );
    }

    #[test]
    fn test_non_matching_loops_untouched() {
        for source in ["[>]", "[-.]", "[.-]", "[]", "[->+<]", "[,]"] {
            let mut program = build(source.as_bytes()).unwrap();
            let original = program.clone();
            let report = optimize(&mut program);
            assert_eq!(report.total(), 0, "{source}");
            assert_eq!(program, original);
        }
    }

    #[test]
    fn test_nested_zero_loop() {
        let program = optimized(b"[[-]]");
        let kinds: Vec<_> = program.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OpKind::LoopOpen,
                OpKind::SetValue,
                OpKind::Noop,
                OpKind::Noop,
                OpKind::LoopClose,
            ]
        );
    }

    #[test]
    fn test_idempotent() {
        let source = b"+[-[<<[+[--->]-[<<<]]]>>>-]>-.---.>..>.<<<<-.<+.>>>>>.>.<<.<-.[-][+][[-]]";
        let mut once = build(source).unwrap();
        optimize(&mut once);

        let mut twice = once.clone();
        let report = optimize(&mut twice);

        assert_eq!(once, twice);
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_empty_rule_set() {
        let mut program = build(b"[-]").unwrap();
        let report = optimize_with(&mut program, &[]);
        assert_eq!(report.total(), 0);
        assert_eq!(program.ops()[0].kind, OpKind::LoopOpen);
    }

    /// Rewrites one position to a fixed op, regardless of what is there.
    struct Overwrite {
        index: usize,
        op: Op,
    }

    impl PeepholeRule for Overwrite {
        fn apply(&self, ops: &mut [Op]) -> usize {
            ops[self.index] = self.op;
            1
        }

        fn name(&self) -> &'static str {
            "overwrite"
        }
    }

    #[test]
    fn test_unbalancing_rule_is_discarded() {
        let original = build(b"[>]").unwrap();

        for rule in [
            Overwrite { index: 2, op: Op::new(OpKind::Noop, 1) },
            Overwrite { index: 0, op: Op::new(OpKind::Output, 1) },
        ] {
            let mut program = original.clone();
            let report = optimize_with(&mut program, &[&rule]);

            assert_eq!(program, original);
            assert_eq!(report.rejected, vec!["overwrite"]);
            assert_eq!(report.total(), 0);
        }
    }

    #[test]
    fn test_balanced_custom_rule_is_kept() {
        let mut program = build(b"[>]").unwrap();
        let rule = Overwrite { index: 1, op: Op::new(OpKind::SetValue, 7) };
        let report = optimize_with(&mut program, &[&rule, &ZeroLoopElision]);

        assert!(report.rejected.is_empty());
        assert_eq!(report.rewrites("overwrite"), 1);
        assert_eq!(program.ops()[1], Op::new(OpKind::SetValue, 7));
    }
}
