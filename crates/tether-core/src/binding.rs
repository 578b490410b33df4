use std::any::{self, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::DelegateError;
use crate::params::{Method, Params};

/// Immutable pairing of a target object and one of its methods.
///
/// The binding observes its target through a `Weak`; it never keeps the
/// target alive. Two bindings are equal iff they point at the same target
/// allocation and the same method. Methods are told apart by their type,
/// never by code address.
pub struct Binding<T: 'static, P: Params> {
    target: Weak<T>,
    method: Arc<dyn Fn(&T, P) + Send + Sync>,
    method_id: TypeId,
    method_name: &'static str,
}

impl<T: 'static, P: Params> Binding<T, P> {
    /// `method` must be a fn item (`Type::method`) or a closure without
    /// captures; anything else is rejected at compile time.
    pub fn new<F: Method<T, P>>(target: &Arc<T>, method: F) -> Self {
        const {
            assert!(
                size_of::<F>() == 0,
                "a bound method must be a fn item or a non-capturing closure"
            )
        };
        Self {
            target: Arc::downgrade(target),
            method: Arc::new(move |target: &T, args: P| Method::call(&method, target, args)),
            method_id: TypeId::of::<F>(),
            method_name: any::type_name::<F>(),
        }
    }

    /// Upgrades the target, if it is still alive.
    pub fn target(&self) -> Option<Arc<T>> {
        self.target.upgrade()
    }

    /// Type name of the bound method, e.g. `my_crate::Counter::add`.
    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Calls the bound method with `args`.
    pub fn call(&self, args: P) -> Result<(), DelegateError> {
        let target = self.target.upgrade().ok_or(DelegateError::TargetDropped)?;
        (self.method)(&*target, args);
        Ok(())
    }
}

impl<T: 'static, P: Params> Clone for Binding<T, P> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
            method: Arc::clone(&self.method),
            method_id: self.method_id,
            method_name: self.method_name,
        }
    }
}

impl<T: 'static, P: Params> PartialEq for Binding<T, P> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target) && self.method_id == other.method_id
    }
}

impl<T: 'static, P: Params> Eq for Binding<T, P> {}

impl<T: 'static, P: Params> fmt::Debug for Binding<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("target", &Weak::as_ptr(&self.target))
            .field("method", &self.method_name)
            .field("arity", &P::ARITY)
            .finish()
    }
}
