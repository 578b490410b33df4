//! Delegate - 呼び出し可能なハンドル
//!
//! # 二層構造
//! - **表層（Typed）**: `MemberDelegate<T, P>` - target 型とメソッドの型が静的に決まる
//! - **内部（Dyn）**: `Delegate<P>` - object-safe, type erasure
//!
//! `Multicast<P>` は `Box<dyn Delegate<P>>` を保持するので、
//! target 型の異なるハンドルを同じリストに並べられる。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::binding::Binding;
use crate::error::DelegateError;
use crate::params::{Method, Params};

/// Object-safe handle over a call with argument list `P`.
///
/// # Object Safety
/// - `clone_box` で Box<dyn Delegate<P>> を複製
/// - `dyn_eq` は `as_any` でダウンキャストしてから比較する
///   （具体型が違えば常に false）
pub trait Delegate<P: Params>: 'static {
    /// Invokes the handle with `args`.
    fn invoke(&self, args: P) -> Result<(), DelegateError>;

    fn clone_box(&self) -> Box<dyn Delegate<P>>;

    fn as_any(&self) -> &dyn Any;

    /// True iff `other` is the same concrete handle type with an equal binding.
    fn dyn_eq(&self, other: &dyn Delegate<P>) -> bool;
}

impl<P: Params> PartialEq for dyn Delegate<P> {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

impl<P: Params> Clone for Box<dyn Delegate<P>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Synchronous handle: invoking it calls the bound method in place.
pub struct MemberDelegate<T: 'static, P: Params> {
    binding: Binding<T, P>,
}

impl<T: 'static, P: Params> MemberDelegate<T, P> {
    pub fn bind(target: &Arc<T>, method: impl Method<T, P>) -> Self {
        Self {
            binding: Binding::new(target, method),
        }
    }

    pub fn binding(&self) -> &Binding<T, P> {
        &self.binding
    }

    pub fn invoke(&self, args: P) -> Result<(), DelegateError> {
        self.binding.call(args)
    }
}

/// Binds `method` on `target` into a synchronous delegate.
pub fn bind<T: 'static, P: Params>(
    target: &Arc<T>,
    method: impl Method<T, P>,
) -> MemberDelegate<T, P> {
    MemberDelegate::bind(target, method)
}

impl<T: 'static, P: Params> Delegate<P> for MemberDelegate<T, P> {
    fn invoke(&self, args: P) -> Result<(), DelegateError> {
        MemberDelegate::invoke(self, args)
    }

    fn clone_box(&self) -> Box<dyn Delegate<P>> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Delegate<P>) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.binding == self.binding)
    }
}

impl<T: 'static, P: Params> Clone for MemberDelegate<T, P> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
        }
    }
}

impl<T: 'static, P: Params> PartialEq for MemberDelegate<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.binding == other.binding
    }
}

impl<T: 'static, P: Params> Eq for MemberDelegate<T, P> {}

impl<T: 'static, P: Params> fmt::Debug for MemberDelegate<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDelegate")
            .field("binding", &self.binding)
            .finish()
    }
}
