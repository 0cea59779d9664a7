//! A boolean that can only move from `false` to `true`.

use crate::Error;

/// A one-way flag.
///
/// Once [Latch::set] has been called the flag stays raised until [Latch::reset], which is reserved
/// for the owner of the latch (i.e. the [crate::Reader] being rewound to the start of its buffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Latch {
    raised: bool,
    name: &'static str,
}

impl Latch {
    /// Creates a lowered latch. `name` is only used in error messages.
    pub const fn new(name: &'static str) -> Self {
        Self {
            raised: false,
            name,
        }
    }

    /// Creates a latch that is already raised.
    pub const fn raised(name: &'static str) -> Self {
        Self { raised: true, name }
    }

    /// Returns whether the latch has been raised.
    pub const fn get(&self) -> bool {
        self.raised
    }

    /// Raises the latch. Returns `true` if this call changed its state.
    pub fn set(&mut self) -> bool {
        let changed = !self.raised;
        self.raised = true;
        changed
    }

    /// Applies an externally requested value.
    ///
    /// Assigning `true` raises the latch, assigning `false` to a lowered latch is a no-op, and
    /// assigning `false` to a raised latch fails with [Error::Latch].
    pub fn try_assign(&mut self, value: bool) -> Result<(), Error> {
        match (self.raised, value) {
            (true, false) => Err(Error::Latch(self.name)),
            (_, true) => {
                self.set();
                Ok(())
            }
            (false, false) => Ok(()),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.raised = false;
    }
}
