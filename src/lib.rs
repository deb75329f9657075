//! Bidirectional stackful coroutines.
//!
//! Each coroutine runs its body on its own mmap'd stack. The caller and the
//! body take strict turns: [`Coroutine::resume`] hands an argument tuple in,
//! and the body's suspend capability hands control (and, for
//! [`BidirectionalCoroutine`], a value) back out.
//!
//! ```
//! use bidi_coroutine::BidirectionalCoroutine;
//!
//! let mut fib = BidirectionalCoroutine::<u64, ()>::new(|yield_| {
//!     yield_.suspend();
//!     let (mut a, mut b) = (0, 1);
//!     loop {
//!         yield_.suspend_with(a);
//!         (a, b) = (b, a + b);
//!     }
//! });
//! let first: Vec<u64> = (0..5).map(|_| *fib.call(())).collect();
//! assert_eq!(first, [0, 1, 1, 2, 3]);
//! ```

pub mod context;
pub mod coroutine;
pub mod slot;
pub mod stream;
#[cfg(test)]
mod tests;

pub use context::DEFAULT_STACK_SIZE;
pub use coroutine::{
    BidirectionalCoroutine, Coroutine, Final, Finish, Resumed, RunState, Yield, YieldWith,
};
pub use slot::Slot;
pub use stream::{CoroutineStream, Stream};
