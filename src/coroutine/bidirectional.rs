use super::anchor::Anchor;
use super::finish::{Final, Finish};
use super::{Coroutine, RunState, Yield};
use crate::context::DEFAULT_STACK_SIZE;
use crate::slot::Slot;
use std::fmt;
use std::io::Error;
use std::mem;
use std::ptr::NonNull;

/// Result storage; `fresh` marks a deposit no `resume` has reported yet.
pub(crate) struct Outbox<R> {
    slot: Slot<R>,
    fresh: bool,
}

/// What the body did with the control it was given.
#[derive(Debug, PartialEq, Eq)]
pub enum Resumed<'a, R> {
    /// Suspended after depositing a value.
    Yielded(&'a R),
    /// Suspended without depositing anything.
    Suspended,
    /// Returned `Final(value)`; the coroutine has terminated.
    Returned(&'a R),
    /// Returned `()`; the coroutine has terminated.
    Complete,
}

impl<'a, R> Resumed<'a, R> {
    #[inline]
    pub fn value(&self) -> Option<&'a R> {
        match *self {
            Resumed::Yielded(value) | Resumed::Returned(value) => Some(value),
            Resumed::Suspended | Resumed::Complete => None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Resumed::Returned(_) | Resumed::Complete)
    }
}

/// Suspend capability that can also hand a value back to the caller.
///
/// Wraps the value-less [`Yield`] of the same coroutine: yielding deposits
/// into the result slot and then performs the plain suspension.
pub struct YieldWith<'y, R, A> {
    base: &'y mut Yield<A>,
    outbox: NonNull<Outbox<R>>,
}

impl<R, A> YieldWith<'_, R, A> {
    /// Deposits `value` for the caller, suspends, and returns the next arguments.
    pub fn suspend_with(&mut self, value: R) -> &mut A {
        self.deposit(value);
        self.base.suspend()
    }

    /// Suspends without depositing a value.
    ///
    /// Bodies normally do this once on entry so the priming switch made by the
    /// constructor does not swallow their first real value.
    pub fn suspend(&mut self) -> &mut A {
        self.base.suspend()
    }

    pub(crate) fn deposit(&mut self, value: R) {
        let outbox = unsafe { &mut *self.outbox.as_ptr() };
        outbox.slot.construct_or_replace(value);
        outbox.fresh = true;
    }
}

/// A coroutine that takes `A` on every resume and yields `R` back.
///
/// Like [`Coroutine`], the handle is invariant in `A`:
///
/// ```compile_fail
/// use bidi_coroutine::BidirectionalCoroutine;
///
/// fn shorten<'a>(
///     coroutine: BidirectionalCoroutine<u32, (&'static str,)>,
/// ) -> BidirectionalCoroutine<u32, (&'a str,)> {
///     coroutine
/// }
/// ```
pub struct BidirectionalCoroutine<R, A> {
    // dropped first: unwinding the body must not outlive the result slot
    base: Coroutine<A>,
    outbox: Anchor<Outbox<R>>,
}

impl<R: 'static, A: 'static> BidirectionalCoroutine<R, A> {
    /// Starts `body` on a [`DEFAULT_STACK_SIZE`] stack and runs it up to its
    /// first suspension. The body terminates silently when it returns.
    ///
    /// # Panics
    /// If the stack cannot be mapped, or if the body panics before suspending.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(&mut YieldWith<'_, R, A>) + 'static,
    {
        match Self::with_stack_size(DEFAULT_STACK_SIZE, body) {
            Ok(coroutine) => coroutine,
            Err(err) => panic!("failed to allocate coroutine stack: {err}"),
        }
    }

    pub fn with_stack_size<F>(stack_size: usize, body: F) -> Result<Self, Error>
    where
        F: FnOnce(&mut YieldWith<'_, R, A>) + 'static,
    {
        Self::spawn(stack_size, body)
    }

    /// Like [`new`](Self::new), for a body that ends by handing back one last
    /// value. The caller sees it as [`Resumed::Returned`].
    ///
    /// # Panics
    /// If the stack cannot be mapped, or if the body panics before suspending.
    pub fn new_final<F, T>(body: F) -> Self
    where
        F: FnOnce(&mut YieldWith<'_, R, A>) -> Final<T> + 'static,
        T: Into<R>,
    {
        match Self::with_stack_size_final(DEFAULT_STACK_SIZE, body) {
            Ok(coroutine) => coroutine,
            Err(err) => panic!("failed to allocate coroutine stack: {err}"),
        }
    }

    pub fn with_stack_size_final<F, T>(stack_size: usize, body: F) -> Result<Self, Error>
    where
        F: FnOnce(&mut YieldWith<'_, R, A>) -> Final<T> + 'static,
        T: Into<R>,
    {
        Self::spawn(stack_size, body)
    }

    fn spawn<F, T>(stack_size: usize, body: F) -> Result<Self, Error>
    where
        F: FnOnce(&mut YieldWith<'_, R, A>) -> T + 'static,
        T: Finish<R>,
    {
        let outbox = Anchor::new(Outbox {
            slot: Slot::allocate(),
            fresh: false,
        });
        let target = outbox.as_ptr();
        let base = Coroutine::with_stack_size(stack_size, move |yield_: &mut Yield<A>| {
            let mut yield_ = YieldWith {
                base: yield_,
                outbox: target,
            };
            body(&mut yield_).finish(&mut yield_);
        })?;
        Ok(Self { base, outbox })
    }
}

impl<R, A> BidirectionalCoroutine<R, A> {
    /// Hands `args` to the body and reports how it gave control back.
    ///
    /// # Panics
    /// If the coroutine has terminated, or re-raises a panic from the body.
    pub fn resume(&mut self, args: A) -> Resumed<'_, R> {
        self.outbox.get_mut().fresh = false;
        self.base.resume(args);
        let fresh = mem::take(&mut self.outbox.get_mut().fresh);
        let outbox = self.outbox.get();
        match (self.base.is_alive(), fresh) {
            (true, true) => Resumed::Yielded(unsafe { outbox.slot.get() }),
            (true, false) => Resumed::Suspended,
            (false, true) => Resumed::Returned(unsafe { outbox.slot.get() }),
            (false, false) => Resumed::Complete,
        }
    }

    /// Resumes and returns whatever the result slot holds afterwards.
    ///
    /// A bare suspension or a silent return leaves the previous value in place.
    ///
    /// # Panics
    /// If the body has never deposited a value.
    pub fn call(&mut self, args: A) -> &R {
        self.resume(args);
        match self.outbox.get().slot.try_get() {
            Some(value) => value,
            None => panic!("coroutine has not yielded a value yet"),
        }
    }

    /// The most recently deposited value, unless it was taken.
    #[inline]
    pub fn latest(&self) -> Option<&R> {
        self.outbox.get().slot.try_get()
    }

    #[inline]
    pub fn take_latest(&mut self) -> Option<R> {
        self.outbox.get_mut().slot.take()
    }

    /// Takes a value deposited while the body ran inside the constructor,
    /// which no `resume` has reported.
    pub(crate) fn take_unreported(&mut self) -> Option<R> {
        let outbox = self.outbox.get_mut();
        if mem::take(&mut outbox.fresh) {
            outbox.slot.take()
        } else {
            None
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.base.is_alive()
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.base.state()
    }
}

impl<R: fmt::Debug, A> fmt::Debug for BidirectionalCoroutine<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidirectionalCoroutine")
            .field("state", &self.state())
            .field("latest", &self.latest())
            .finish()
    }
}
