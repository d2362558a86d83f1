//! Operation IR for brainfuck programs.
//!
//! A [`Program`] is a flat sequence of [`Op`]s, each a kind tag plus a
//! single byte argument. Runs of `>`, `<`, `+` and `-` are folded into one
//! op carrying a repeat count while building, so the IR is already
//! compressed when the optimizer sees it.
//!
//! ```text
//! ++++[->+<]   =>   add 4, open, sub 1, right 1, add 1, left 1, close
//! ```
//!
//! The sequence is never reordered and ops are never deleted. The optimizer
//! only rewrites kinds and arguments in place, turning ops into
//! [`OpKind::Noop`] or [`OpKind::SetValue`], so op indices stay stable for
//! listings and diagnostics.

use std::fmt;

pub mod builder;
pub mod optimize;
pub mod printer;

pub use builder::build;
pub use optimize::{optimize, optimize_with, OptimizeReport, PeepholeRule, ZeroLoopElision};

/// Largest repeat count a single op can carry.
pub const MAX_ARG: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    MoveRight,
    MoveLeft,
    Increment,
    Decrement,
    Output,
    Input,
    LoopOpen,
    LoopClose,
    /// Rewritten away by the optimizer; encodes to nothing.
    Noop,
    /// Store the argument into the current cell.
    SetValue,
}

/// Static description of an [`OpKind`].
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    /// Source command byte, if the kind has one.
    pub command: Option<u8>,
    /// Whether consecutive commands merge into one op.
    pub repeatable: bool,
}

impl OpKind {
    pub const fn info(self) -> OpInfo {
        use OpKind::*;
        match self {
            MoveRight => OpInfo { name: "right", command: Some(b'>'), repeatable: true },
            MoveLeft => OpInfo { name: "left", command: Some(b'<'), repeatable: true },
            Increment => OpInfo { name: "add", command: Some(b'+'), repeatable: true },
            Decrement => OpInfo { name: "sub", command: Some(b'-'), repeatable: true },
            Output => OpInfo { name: "out", command: Some(b'.'), repeatable: false },
            Input => OpInfo { name: "in", command: Some(b','), repeatable: false },
            LoopOpen => OpInfo { name: "open", command: Some(b'['), repeatable: false },
            LoopClose => OpInfo { name: "close", command: Some(b']'), repeatable: false },
            Noop => OpInfo { name: "noop", command: None, repeatable: false },
            SetValue => OpInfo { name: "set", command: None, repeatable: false },
        }
    }

    pub const fn name(self) -> &'static str {
        self.info().name
    }

    pub const fn is_repeatable(self) -> bool {
        self.info().repeatable
    }

    /// Map a source byte to its op kind; anything else is a comment.
    pub const fn from_command(byte: u8) -> Option<OpKind> {
        match byte {
            b'>' => Some(OpKind::MoveRight),
            b'<' => Some(OpKind::MoveLeft),
            b'+' => Some(OpKind::Increment),
            b'-' => Some(OpKind::Decrement),
            b'.' => Some(OpKind::Output),
            b',' => Some(OpKind::Input),
            b'[' => Some(OpKind::LoopOpen),
            b']' => Some(OpKind::LoopClose),
            _ => None,
        }
    }
}

/// One IR operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
    pub kind: OpKind,
    pub arg: u8,
}

impl Op {
    pub const fn new(kind: OpKind, arg: u8) -> Self {
        Self { kind, arg }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OpKind::MoveRight
            | OpKind::MoveLeft
            | OpKind::Increment
            | OpKind::Decrement
            | OpKind::SetValue => write!(f, "{} {}", self.kind.name(), self.arg),
            _ => f.write_str(self.kind.name()),
        }
    }
}

/// A validated op sequence.
///
/// Only [`build`] creates a `Program`, and only after checking bracket
/// balance, so every `LoopClose` has a matching `LoopOpen` before it.
/// Rewrite passes keep that property: [`optimize_with`] discards any pass
/// whose output is no longer balanced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    ops: Vec<Op>,
}

impl Program {
    pub(crate) fn from_ops(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// In-place access for rewrite passes. Length and order are fixed.
    pub(crate) fn ops_mut(&mut self) -> &mut [Op] {
        &mut self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Op> {
        self.ops.iter()
    }

    /// Number of ops that are not [`OpKind::Noop`].
    pub fn live_len(&self) -> usize {
        self.ops.iter().filter(|op| op.kind != OpKind::Noop).count()
    }
}

/// True when every `LoopClose` closes an earlier `LoopOpen` and none is
/// left open.
pub(crate) fn brackets_balanced(ops: &[Op]) -> bool {
    let mut depth = 0usize;
    for op in ops {
        match op.kind {
            OpKind::LoopOpen => depth += 1,
            OpKind::LoopClose => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_mapping() {
        for kind in [
            OpKind::MoveRight,
            OpKind::MoveLeft,
            OpKind::Increment,
            OpKind::Decrement,
            OpKind::Output,
            OpKind::Input,
            OpKind::LoopOpen,
            OpKind::LoopClose,
        ] {
            let command = kind.info().command.unwrap();
            assert_eq!(OpKind::from_command(command), Some(kind));
        }

        assert_eq!(OpKind::Noop.info().command, None);
        assert_eq!(OpKind::SetValue.info().command, None);
        assert_eq!(OpKind::from_command(b'a'), None);
        assert_eq!(OpKind::from_command(b' '), None);
    }

    #[test]
    fn test_repeatable_kinds() {
        assert!(OpKind::MoveRight.is_repeatable());
        assert!(OpKind::Decrement.is_repeatable());
        assert!(!OpKind::Output.is_repeatable());
        assert!(!OpKind::LoopOpen.is_repeatable());
        assert!(!OpKind::SetValue.is_repeatable());
    }

    #[test]
    fn test_op_display() {
        assert_eq!(Op::new(OpKind::Increment, 12).to_string(), "add 12");
        assert_eq!(Op::new(OpKind::SetValue, 0).to_string(), "set 0");
        assert_eq!(Op::new(OpKind::LoopOpen, 1).to_string(), "open");
        assert_eq!(Op::new(OpKind::Noop, 1).to_string(), "noop");
    }

    #[test]
    fn test_brackets_balanced() {
        let open = Op::new(OpKind::LoopOpen, 1);
        let close = Op::new(OpKind::LoopClose, 1);
        let noop = Op::new(OpKind::Noop, 1);

        assert!(brackets_balanced(&[]));
        assert!(brackets_balanced(&[open, open, close, noop, close]));
        assert!(!brackets_balanced(&[open, noop]));
        assert!(!brackets_balanced(&[close, open]));
        assert!(!brackets_balanced(&[open, close, close]));
    }
}
