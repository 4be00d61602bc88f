//! Scoped replacement of the active query parameters.

use std::ops::Deref;

use crate::config::QueryParameters;

/// Temporarily swaps the query parameters held in `slot`.
///
/// The original value is put back when the guard is dropped, so every exit
/// path out of a fallback sequence (normal completion, early `break`, `?`,
/// or a panic unwinding through it) leaves the parameters unchanged.
#[derive(Debug)]
pub(crate) struct ScopedParams<'a> {
    slot: &'a mut QueryParameters,
    original: QueryParameters,
}

impl<'a> ScopedParams<'a> {
    pub(crate) fn new(slot: &'a mut QueryParameters) -> Self {
        let original = slot.clone();
        Self { slot, original }
    }

    /// Makes `params` the active parameters until the next call or drop.
    pub(crate) fn replace(&mut self, params: QueryParameters) {
        *self.slot = params;
    }
}

impl Deref for ScopedParams<'_> {
    type Target = QueryParameters;

    fn deref(&self) -> &Self::Target {
        &*self.slot
    }
}

impl Drop for ScopedParams<'_> {
    fn drop(&mut self) {
        std::mem::swap(&mut *self.slot, &mut self.original);
    }
}
