//! Backpatch stack used to pair loop branches during code generation.
//!
//! Every `[` pushes the code offset just past its placeholder displacement;
//! the matching `]` pops it. Nesting guarantees the most recent open loop is
//! the one being closed, so a plain LIFO is enough to resolve both branch
//! ends in one forward pass.
//!
//! Storage is a flat `Vec<usize>` grown by doubling. Growth goes through
//! `try_reserve` so an allocation failure is reported as
//! [`CompileError::ResourceExhausted`] instead of aborting the process.

use super::error::{CompileError, CompileResult};

/// Capacity reserved by [`PatchStack::new`].
pub const INITIAL_CAPACITY: usize = 4;

/// LIFO store of code buffer offsets.
///
/// Entries are opaque to the stack. The backing storage is released when
/// the stack is dropped, on success and error paths alike.
#[derive(Debug)]
pub struct PatchStack {
    entries: Vec<usize>,
}

impl PatchStack {
    /// Create an empty stack with [`INITIAL_CAPACITY`] slots.
    pub fn new() -> CompileResult<Self> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(INITIAL_CAPACITY)
            .map_err(|_| CompileError::ResourceExhausted { what: "backpatch stack" })?;
        Ok(Self { entries })
    }

    /// Push an offset, doubling the storage when full.
    pub fn push(&mut self, offset: usize) -> CompileResult<()> {
        if self.entries.len() == self.entries.capacity() {
            let additional = self.entries.capacity().max(INITIAL_CAPACITY);
            self.entries
                .try_reserve_exact(additional)
                .map_err(|_| CompileError::ResourceExhausted { what: "backpatch stack" })?;
            log::trace!("patch stack grown to {} slots", self.capacity());
        }
        self.entries.push(offset);
        Ok(())
    }

    /// Remove and return the most recently pushed offset.
    pub fn pop(&mut self) -> Option<usize> {
        self.entries.pop()
    }

    /// Most recently pushed offset, without removing it.
    pub fn top(&self) -> Option<usize> {
        self.entries.last().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots available before the next growth.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack = PatchStack::new().unwrap();
        stack.push(3).unwrap();
        stack.push(2).unwrap();
        stack.push(1).unwrap();

        assert_eq!(stack.top(), Some(1));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.top(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_growth_doubles_capacity() {
        let mut stack = PatchStack::new().unwrap();
        assert_eq!(stack.capacity(), INITIAL_CAPACITY);

        for offset in 0..INITIAL_CAPACITY {
            stack.push(offset).unwrap();
        }
        assert_eq!(stack.capacity(), INITIAL_CAPACITY);

        // Fifth push needs a reallocation; contents must survive it.
        stack.push(100).unwrap();
        assert!(stack.capacity() >= INITIAL_CAPACITY * 2);
        assert_eq!(stack.len(), 5);
        for expected in [100, 3, 2, 1, 0] {
            assert_eq!(stack.pop(), Some(expected));
        }
    }

    #[test]
    fn test_deep_nesting() {
        let mut stack = PatchStack::new().unwrap();
        for offset in 0..10_000 {
            stack.push(offset).unwrap();
        }
        for offset in (0..10_000).rev() {
            assert_eq!(stack.pop(), Some(offset));
        }
        assert!(stack.is_empty());
    }
}
