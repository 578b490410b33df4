//! Capsule - スレッドを跨ぐ単発の呼び出し記録
//!
//! # 所有権
//! - 呼び出し側スレッドで生成 → `DispatchChannel::dispatch` で所有権を渡す
//! - 宛先スレッドで `invoke(self: Box<Self>)` により消費される
//! - `invoke` は Box を消費するので二重実行はコンパイル時に起こり得ない

use std::fmt;

use crate::binding::Binding;
use crate::error::DelegateError;
use crate::params::Params;

/// A type-erased call, ready to run on whichever thread consumes it.
pub trait Capsule: Send {
    /// Runs the captured call now, consuming the capsule.
    fn invoke(self: Box<Self>) -> Result<(), DelegateError>;

    /// Short description for log output. Must not allocate.
    fn describe(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Captured arguments plus the binding they must be applied to.
pub struct CallCapsule<T: 'static, P: Params> {
    binding: Binding<T, P>,
    args: P,
}

impl<T: 'static, P: Params> CallCapsule<T, P> {
    /// Moves `args` into a new capsule. Nothing runs until `invoke`.
    pub fn new(binding: Binding<T, P>, args: P) -> Self {
        Self { binding, args }
    }

    pub fn binding(&self) -> &Binding<T, P> {
        &self.binding
    }
}

impl<T, P> Capsule for CallCapsule<T, P>
where
    T: Send + Sync + 'static,
    P: Params + Send,
{
    fn invoke(self: Box<Self>) -> Result<(), DelegateError> {
        let Self { binding, args } = *self;
        binding.call(args)
    }

    fn describe(&self) -> &'static str {
        self.binding.method_name()
    }
}

impl<T: 'static, P: Params> fmt::Debug for CallCapsule<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallCapsule")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// Capsule around a plain closure.
pub struct FnCapsule<F> {
    f: F,
}

/// Wraps `f` so it can be dispatched like any bound call.
pub fn from_fn<F>(f: F) -> Box<dyn Capsule>
where
    F: FnOnce() + Send + 'static,
{
    Box::new(FnCapsule { f })
}

impl<F> Capsule for FnCapsule<F>
where
    F: FnOnce() + Send,
{
    fn invoke(self: Box<Self>) -> Result<(), DelegateError> {
        (self.f)();
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "closure"
    }
}
