//! How a body's return value is folded into the result channel.
//!
//! A body handed to [`BidirectionalCoroutine::new`] returns `()` and terminates
//! silently; a body that loops forever has that shape too. A body handed to
//! [`BidirectionalCoroutine::new_final`] returns [`Final`] and deposits one last
//! value, observed by the caller as [`Resumed::Returned`] on the same switch
//! that terminates the coroutine. The final value may be of any type that
//! converts into the yielded type. Any other return type does not compile:
//!
//! ```compile_fail
//! use bidi_coroutine::BidirectionalCoroutine;
//!
//! let _ = BidirectionalCoroutine::<i32, ()>::new(|yield_| {
//!     yield_.suspend();
//!     String::from("not an i32")
//! });
//! ```
//!
//! ```compile_fail
//! use bidi_coroutine::{BidirectionalCoroutine, Final};
//!
//! let _ = BidirectionalCoroutine::<i32, ()>::new_final(|yield_| {
//!     yield_.suspend();
//!     Final(String::from("not an i32"))
//! });
//! ```
//!
//! [`BidirectionalCoroutine::new`]: super::BidirectionalCoroutine::new
//! [`BidirectionalCoroutine::new_final`]: super::BidirectionalCoroutine::new_final
//! [`Resumed::Returned`]: super::Resumed::Returned

use super::bidirectional::YieldWith;

mod private {
    pub trait Sealed {}

    impl Sealed for () {}
    impl<T> Sealed for super::Final<T> {}
}

/// A value a coroutine body may return. Implemented only for `()` and [`Final`].
pub trait Finish<R>: private::Sealed {
    /// Runs on the coroutine stack after the body returns, before control goes
    /// back to the caller for the last time.
    fn finish<A>(self, yield_: &mut YieldWith<'_, R, A>);
}

impl<R> Finish<R> for () {
    #[inline]
    fn finish<A>(self, _: &mut YieldWith<'_, R, A>) {}
}

/// The last value of a finite body, delivered without another suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Final<T>(pub T);

impl<R, T: Into<R>> Finish<R> for Final<T> {
    #[inline]
    fn finish<A>(self, yield_: &mut YieldWith<'_, R, A>) {
        yield_.deposit(self.0.into());
    }
}
