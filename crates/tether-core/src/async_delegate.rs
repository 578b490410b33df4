use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::binding::Binding;
use crate::capsule::CallCapsule;
use crate::channel::DispatchChannel;
use crate::delegate::Delegate;
use crate::error::DelegateError;
use crate::params::{Method, Params};

/// Handle that runs its bound method on another thread.
///
/// `invoke` moves the arguments into a [`CallCapsule`], hands it to the
/// channel and returns without waiting. The method itself runs later on the
/// channel's thread; nothing about its completion is reported back.
pub struct AsyncDelegate<T: 'static, P: Params> {
    binding: Binding<T, P>,
    channel: Arc<dyn DispatchChannel>,
}

impl<T, P> AsyncDelegate<T, P>
where
    T: Send + Sync + 'static,
    P: Params + Send,
{
    pub fn bind(
        target: &Arc<T>,
        method: impl Method<T, P>,
        channel: Arc<dyn DispatchChannel>,
    ) -> Self {
        Self {
            binding: Binding::new(target, method),
            channel,
        }
    }

    pub fn binding(&self) -> &Binding<T, P> {
        &self.binding
    }

    pub fn channel(&self) -> &Arc<dyn DispatchChannel> {
        &self.channel
    }

    /// Queues the call on the bound channel.
    ///
    /// Fails with [`DelegateError::ChannelClosed`] once the channel stopped
    /// accepting work; the arguments are dropped on this thread in that case.
    pub fn invoke(&self, args: P) -> Result<(), DelegateError> {
        let capsule = CallCapsule::new(self.binding.clone(), args);
        tracing::trace!(channel = self.channel.name(), binding = ?self.binding, "delegate.dispatch");
        self.channel.dispatch(Box::new(capsule))
    }
}

/// Binds `method` on `target` so that calls run on `channel`'s thread.
pub fn bind_async<T, P>(
    target: &Arc<T>,
    method: impl Method<T, P>,
    channel: Arc<dyn DispatchChannel>,
) -> AsyncDelegate<T, P>
where
    T: Send + Sync + 'static,
    P: Params + Send,
{
    AsyncDelegate::bind(target, method, channel)
}

impl<T, P> Delegate<P> for AsyncDelegate<T, P>
where
    T: Send + Sync + 'static,
    P: Params + Send,
{
    fn invoke(&self, args: P) -> Result<(), DelegateError> {
        AsyncDelegate::invoke(self, args)
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
            .is_some_and(|other| other == self)
    }
}

impl<T: 'static, P: Params> Clone for AsyncDelegate<T, P> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<T: 'static, P: Params> PartialEq for AsyncDelegate<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.binding == other.binding
            && std::ptr::addr_eq(Arc::as_ptr(&self.channel), Arc::as_ptr(&other.channel))
    }
}

impl<T: 'static, P: Params> Eq for AsyncDelegate<T, P> {}

impl<T: 'static, P: Params> fmt::Debug for AsyncDelegate<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncDelegate")
            .field("binding", &self.binding)
            .field("channel", &self.channel.name())
            .finish()
    }
}
