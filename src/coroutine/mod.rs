//! Two-party stackful coroutines that exchange values on every switch.
//!
//! [`Coroutine`] is the value-less shape: the caller passes an argument tuple
//! `A` on each [`resume`](Coroutine::resume) and the body sees it as the return
//! value of [`Yield::suspend`]. [`BidirectionalCoroutine`] layers a result slot
//! on top so the body can also hand an `R` back on every suspension.

mod anchor;
pub mod bidirectional;
pub mod finish;

use crate::context::continuation::Continuation;
use crate::context::stack::{fetch_or_alloc_stack, return_or_release_stack, Stack};
use crate::context::DEFAULT_STACK_SIZE;
use crate::slot::Slot;
use anchor::Anchor;
use std::any::Any;
use std::fmt;
use std::io::Error;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use tracing::{debug, error, warn};

pub use bidirectional::{BidirectionalCoroutine, Resumed, YieldWith};
pub use finish::{Final, Finish};

/// Where a coroutine is in its life cycle.
///
/// `Running` is only ever observed from inside the body; the caller sees
/// `Suspended` or `Done` between resumes.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum RunState {
    Created,
    Running,
    Suspended,
    Done,
}

/// Unwinding payload that tears down a suspended body when its handle drops.
struct Cancelled;

/// Hot storage shared between a handle and the body running on its stack.
pub(crate) struct Frame<A> {
    args: Slot<A>,
    state: RunState,
    cancelled: bool,
    panic: Option<Box<dyn Any + Send>>,
}

/// Passed by address on the priming switch; lives on the constructor's stack.
struct Launch<F, A> {
    body: Option<F>,
    frame: NonNull<Frame<A>>,
}

unsafe extern "C" fn trampoline<F, A>(vp: isize)
where
    F: FnOnce(&mut Yield<A>),
{
    let (caller, data) = Continuation::entered(vp);
    let launch = &mut *(data as *mut Launch<F, A>);
    let frame = launch.frame;
    let body = launch.body.take();
    (*frame.as_ptr()).state = RunState::Running;

    let mut yield_ = Yield {
        frame,
        caller: Some(caller),
        _marker: PhantomData,
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if let Some(body) = body {
            body(&mut yield_);
        }
    }));
    if let Err(payload) = outcome {
        if !payload.is::<Cancelled>() {
            (*frame.as_ptr()).panic = Some(payload);
        }
    }
    (*frame.as_ptr()).state = RunState::Done;

    match yield_.caller.take() {
        Some(caller) => caller.finish(),
        None => {
            error!(target: "bidi_coroutine::coroutine", "Coroutine finished without a caller to return to");
            std::process::abort();
        }
    }
}

/// The body's right to hand control back to its caller.
///
/// Only ever lent to the body as `&mut`; it is valid for the one coroutine
/// that created it.
pub struct Yield<A> {
    frame: NonNull<Frame<A>>,
    caller: Option<Continuation>,
    _marker: PhantomData<*mut A>,
}

impl<A> Yield<A> {
    /// Suspends the body and returns the arguments of the next `resume`.
    pub fn suspend(&mut self) -> &mut A {
        self.switch_to_caller();
        unsafe { (*self.frame.as_ptr()).args.get_mut() }
    }

    fn switch_to_caller(&mut self) {
        let frame = self.frame.as_ptr();
        unsafe {
            if (*frame).cancelled {
                panic::resume_unwind(Box::new(Cancelled));
            }
            let caller = match self.caller.take() {
                Some(caller) => caller,
                None => unreachable!("suspend capability has no caller"),
            };
            (*frame).state = RunState::Suspended;
            self.caller = caller.resume(0);
            (*frame).state = RunState::Running;
            if (*frame).cancelled {
                panic::resume_unwind(Box::new(Cancelled));
            }
        }
    }
}

/// A coroutine that takes an argument tuple `A` on every resume and yields nothing back.
///
/// The handle is invariant in `A`: the body keeps whatever lifetimes it was
/// created with, so a caller cannot shorten them and pass in a borrow that the
/// body could outlive.
///
/// ```compile_fail
/// use bidi_coroutine::Coroutine;
///
/// fn shorten<'a>(coroutine: Coroutine<(&'static str,)>) -> Coroutine<(&'a str,)> {
///     coroutine
/// }
/// ```
pub struct Coroutine<A> {
    next: Option<Continuation>,
    frame: Anchor<Frame<A>>,
    stack: Option<Stack>,
    // invariant in A, and neither Send nor Sync
    _marker: PhantomData<*mut A>,
}

impl<A> Coroutine<A> {
    /// Starts `body` on a fresh stack of [`DEFAULT_STACK_SIZE`] bytes and runs it
    /// up to its first suspension.
    ///
    /// # Panics
    /// If the stack cannot be mapped, or if the body panics before suspending.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(&mut Yield<A>) + 'static,
    {
        match Self::with_stack_size(DEFAULT_STACK_SIZE, body) {
            Ok(coroutine) => coroutine,
            Err(err) => panic!("failed to allocate coroutine stack: {err}"),
        }
    }

    /// Like [`Coroutine::new`], with an explicit stack size, reporting allocation failure.
    pub fn with_stack_size<F>(stack_size: usize, body: F) -> Result<Self, Error>
    where
        F: FnOnce(&mut Yield<A>) + 'static,
    {
        let stack = fetch_or_alloc_stack(stack_size)?;
        let frame = Anchor::new(Frame {
            args: Slot::allocate(),
            state: RunState::Created,
            cancelled: false,
            panic: None,
        });
        let mut launch = Launch {
            body: Some(body),
            frame: frame.as_ptr(),
        };
        let entry = unsafe { Continuation::start(&stack, trampoline::<F, A>) };
        let mut coroutine = Self {
            next: Some(entry),
            frame,
            stack: Some(stack),
            _marker: PhantomData,
        };

        debug!(target: "bidi_coroutine::coroutine", stack_size, "Starting coroutine");
        coroutine.switch(&mut launch as *mut Launch<F, A> as usize);
        Ok(coroutine)
    }

    /// Hands `args` to the body and runs it until it suspends or returns.
    ///
    /// # Panics
    /// If the coroutine has terminated, or re-raises a panic from the body.
    pub fn resume(&mut self, args: A) {
        assert!(
            self.is_alive(),
            "resumed a coroutine that has already terminated"
        );
        self.frame.get_mut().args.construct_or_replace(args);
        self.switch(0);
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.next.is_some()
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.frame.get().state
    }

    fn switch(&mut self, data: usize) {
        let next = match self.next.take() {
            Some(next) => next,
            None => panic!("resumed a coroutine that has already terminated"),
        };
        self.next = unsafe { next.resume(data) };
        if self.next.is_none() {
            debug!(target: "bidi_coroutine::coroutine", "Coroutine terminated");
            if let Some(payload) = self.frame.get_mut().panic.take() {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl<A> Drop for Coroutine<A> {
    fn drop(&mut self) {
        if let Some(next) = self.next.take() {
            debug!(target: "bidi_coroutine::coroutine", "Unwinding suspended coroutine");
            self.frame.get_mut().cancelled = true;
            if unsafe { next.resume(0) }.is_some() {
                error!(target: "bidi_coroutine::coroutine", "Coroutine suspended while being unwound");
                std::process::abort();
            }
            if self.frame.get_mut().panic.take().is_some() {
                warn!(target: "bidi_coroutine::coroutine", "Discarding panic raised while unwinding a coroutine");
            }
        }
        if let Some(stack) = self.stack.take() {
            return_or_release_stack(stack);
        }
    }
}

impl<A> fmt::Debug for Coroutine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
