//! Ordered, named-channel callbacks with per-subscription cancellation.
//!
//! A [`CallbackBus`] maps channels to handlers in subscription order. The bus
//! is shared by reference (`Rc<CallbackBus<..>>`) and uses interior
//! mutability, so handlers may subscribe or cancel while a dispatch is in
//! flight:
//!
//! - a handler cancelled mid-dispatch is never invoked afterwards;
//! - a handler subscribed mid-dispatch first runs on the next dispatch;
//! - a handler that re-dispatches its own channel is skipped for the nested
//!   call instead of being re-entered.
//!
//! Handler errors are not caught: the first failure stops the dispatch and is
//! returned to the caller as-is.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;

type Handler<E> = Rc<RefCell<dyn FnMut(&E) -> Result<()>>>;

/// Opaque handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(u64);

struct Registration<C, E> {
    id: u64,
    channel: C,
    handler: Handler<E>,
}

struct BusInner<C, E> {
    next_id: u64,
    registrations: Vec<Registration<C, E>>,
}

pub struct CallbackBus<C, E> {
    inner: RefCell<BusInner<C, E>>,
}

impl<C, E> CallbackBus<C, E>
where
    C: Copy + Eq + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(BusInner {
                next_id: 0,
                registrations: Vec::new(),
            }),
        }
    }

    /// Registers `handler` on `channel`, after every handler already there.
    pub fn subscribe<F>(&self, channel: C, handler: F) -> CallbackToken
    where
        F: FnMut(&E) -> Result<()> + 'static,
    {
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.registrations.push(Registration {
            id,
            channel,
            handler,
        });
        tracing::trace!(?channel, token = id, "callback subscribed");
        CallbackToken(id)
    }

    /// Removes the registration behind `token`.
    ///
    /// Returns `false` when the token is unknown or was already cancelled.
    pub fn cancel(&self, token: CallbackToken) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.registrations.len();
        inner.registrations.retain(|entry| entry.id != token.0);
        let removed = inner.registrations.len() != before;
        if removed {
            tracing::trace!(token = token.0, "callback cancelled");
        }
        removed
    }

    pub fn is_live(&self, token: CallbackToken) -> bool {
        self.inner
            .borrow()
            .registrations
            .iter()
            .any(|entry| entry.id == token.0)
    }

    /// Invokes every live handler on `channel` in subscription order.
    pub fn dispatch(&self, channel: C, event: &E) -> Result<()> {
        let snapshot: Vec<(u64, Handler<E>)> = self
            .inner
            .borrow()
            .registrations
            .iter()
            .filter(|entry| entry.channel == channel)
            .map(|entry| (entry.id, Rc::clone(&entry.handler)))
            .collect();

        for (id, handler) in snapshot {
            if !self.is_live(CallbackToken(id)) {
                continue;
            }
            let Ok(mut handler) = handler.try_borrow_mut() else {
                tracing::trace!(?channel, token = id, "skipping re-entrant callback");
                continue;
            };
            (&mut *handler)(event)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every registration on every channel.
    pub fn clear(&self) {
        // Handlers are dropped after the borrow ends so their destructors may
        // touch the bus.
        let drained = std::mem::take(&mut self.inner.borrow_mut().registrations);
        drop(drained);
    }
}

impl<C, E> Default for CallbackBus<C, E>
where
    C: Copy + Eq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
