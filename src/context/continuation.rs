use super::libcontext::{fcontext_t, jump_fcontext, make_fcontext};
use super::stack::Stack;
use libc::c_void;
use std::ptr::{self, NonNull};

/// Handed across every switch so the receiving side learns where to jump back to.
#[repr(C)]
struct Transfer {
    from: fcontext_t,
    data: usize,
}

/// A parked execution context that can be resumed exactly once.
///
/// Resuming consumes the token; the side that later switches back hands the
/// resumer a fresh token for itself. A side that terminates hands back nothing.
pub(crate) struct Continuation(NonNull<c_void>);

impl Continuation {
    /// Prepares `entry` to run on `stack` the first time the token is resumed.
    ///
    /// # Safety
    /// `entry` must start with [`Continuation::entered`] and end with
    /// [`Continuation::finish`]; the stack must outlive every resumption.
    #[inline]
    pub(crate) unsafe fn start(stack: &Stack, entry: unsafe extern "C" fn(isize)) -> Self {
        let ctx = make_fcontext(stack.top, stack.size, Some(entry));
        Self(NonNull::new_unchecked(ctx))
    }

    /// Recovers the resumer's token and the data it passed, on a freshly started stack.
    ///
    /// # Safety
    /// `vp` must be the argument the entry function was called with.
    #[inline]
    pub(crate) unsafe fn entered(vp: isize) -> (Self, usize) {
        let transfer = &*(vp as *const Transfer);
        (Self(NonNull::new_unchecked(transfer.from)), transfer.data)
    }

    /// Switches to this context, returning once something switches back.
    ///
    /// # Safety
    /// The target must still be parked on a live stack.
    #[inline]
    pub(crate) unsafe fn resume(self, data: usize) -> Option<Self> {
        let mut transfer = Transfer {
            from: ptr::null_mut(),
            data,
        };
        let vp = jump_fcontext(
            ptr::addr_of_mut!(transfer.from),
            self.0.as_ptr(),
            ptr::addr_of_mut!(transfer) as isize,
            1,
        );
        let incoming = vp as *const Transfer;
        if incoming.is_null() {
            None
        } else {
            Some(Self(NonNull::new_unchecked((*incoming).from)))
        }
    }

    /// Leaves a terminating stack for good; the peer's `resume` yields `None`.
    ///
    /// # Safety
    /// Nothing on the current stack may be relied upon afterwards.
    #[inline]
    pub(crate) unsafe fn finish(self) -> ! {
        let mut abandoned: fcontext_t = ptr::null_mut();
        jump_fcontext(&mut abandoned, self.0.as_ptr(), 0, 1);
        unreachable!("a finished context was resumed")
    }
}
