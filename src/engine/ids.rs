//! Wire id allocation.

/// First id handed out on a fresh connection.
pub(crate) const FIRST_ID: u64 = 1;

/// Monotonic allocator shared by calls and subscribers.
///
/// Calls and subscribers draw from the same sequence, so a subscriber id is
/// always the id of the call that registered it.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) fn new() -> Self { Self { next: FIRST_ID } }

    /// Take the next id.
    pub(crate) fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Restart the sequence at [`FIRST_ID`].
    ///
    /// Only a fresh open resets the sequence. Recovery keeps counting so a
    /// late reply for a pre-closure id can never match a replayed call.
    pub(crate) fn reset(&mut self) { self.next = FIRST_ID; }
}
