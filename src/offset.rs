use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a message within a single `complete` call's combined
/// input+output stream.
///
/// Offsets are strictly increasing within a stream; the engine never
/// reuses or reorders them. See [`crate::message`] invariant 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Offset(u64);

impl Offset {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out the next free offset for the Output Builder (§4.5).
///
/// Seeded from `max(input.offset) + 1` and incremented once per
/// message appended to the output buffer.
#[derive(Debug, Clone, Copy)]
pub struct OffsetAllocator {
    next: Offset,
}

impl OffsetAllocator {
    /// Seeds the allocator so the first allocated offset continues the
    /// input stream without a gap. `max_input_offset` is `None` when the
    /// input stream was empty.
    pub fn starting_after(max_input_offset: Option<Offset>) -> Self {
        let next = match max_input_offset {
            Some(o) => o.next(),
            None => Offset::new(1),
        };
        Self { next }
    }

    pub fn allocate(&mut self) -> Offset {
        let offset = self.next;
        self.next = self.next.next();
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_after_none_begins_at_one() {
        let mut alloc = OffsetAllocator::starting_after(None);
        assert_eq!(alloc.allocate(), Offset::new(1));
        assert_eq!(alloc.allocate(), Offset::new(2));
    }

    #[test]
    fn starting_after_continues_without_gap() {
        let mut alloc = OffsetAllocator::starting_after(Some(Offset::new(4)));
        assert_eq!(alloc.allocate(), Offset::new(5));
        assert_eq!(alloc.allocate(), Offset::new(6));
    }

    #[test]
    fn offsets_are_ordered() {
        assert!(Offset::new(1) < Offset::new(2));
    }
}
