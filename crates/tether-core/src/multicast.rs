use std::fmt;
use std::ops::{AddAssign, SubAssign};

use crate::delegate::Delegate;
use crate::error::DelegateError;
use crate::params::Params;

/// Ordered list of delegates invoked together as one broadcast.
///
/// Design:
/// - `add` stores a clone, never the caller's handle.
/// - Insertion order is invocation order; duplicates are allowed.
/// - `remove` drops *every* entry equal to the given handle.
///
/// Not meant for concurrent mutation; wrap it in a lock if several threads
/// register listeners.
pub struct Multicast<P: Params> {
    delegates: Vec<Box<dyn Delegate<P>>>,
}

impl<P: Params> Multicast<P> {
    pub fn new() -> Self {
        Self {
            delegates: Vec::new(),
        }
    }

    /// Appends a clone of `delegate`.
    pub fn add(&mut self, delegate: &dyn Delegate<P>) {
        self.delegates.push(delegate.clone_box());
    }

    /// Removes every registered delegate equal to `delegate`.
    ///
    /// Returns how many entries were removed.
    pub fn remove(&mut self, delegate: &dyn Delegate<P>) -> usize {
        let before = self.delegates.len();
        self.delegates.retain(|d| !d.dyn_eq(delegate));
        before - self.delegates.len()
    }

    pub fn contains(&self, delegate: &dyn Delegate<P>) -> bool {
        self.delegates.iter().any(|d| d.dyn_eq(delegate))
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    pub fn clear(&mut self) {
        self.delegates.clear();
    }

    /// Invokes every delegate in insertion order.
    ///
    /// Each delegate but the last gets a clone of `args`; the last one gets
    /// `args` itself. The first error stops the broadcast and is returned.
    /// A panic in a listener is not caught and skips the remaining ones too.
    pub fn invoke(&self, args: P) -> Result<(), DelegateError>
    where
        P: Clone,
    {
        let Some((last, rest)) = self.delegates.split_last() else {
            return Ok(());
        };
        for delegate in rest {
            delegate.invoke(args.clone())?;
        }
        last.invoke(args)
    }
}

impl<P: Params> Default for Multicast<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Params> Clone for Multicast<P> {
    fn clone(&self) -> Self {
        Self {
            delegates: self.delegates.clone(),
        }
    }
}

impl<P: Params> fmt::Debug for Multicast<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multicast")
            .field("len", &self.delegates.len())
            .field("arity", &P::ARITY)
            .finish()
    }
}

impl<P: Params, D: Delegate<P>> AddAssign<&D> for Multicast<P> {
    fn add_assign(&mut self, delegate: &D) {
        self.add(delegate);
    }
}

impl<P: Params, D: Delegate<P>> SubAssign<&D> for Multicast<P> {
    fn sub_assign(&mut self, delegate: &D) {
        self.remove(delegate);
    }
}
