use super::Stream;
use crate::coroutine::{BidirectionalCoroutine, Resumed};
use std::fmt;
use std::rc::Rc;

/// Memoizes a nullary coroutine, which can only be run once, as a [`Stream`],
/// which can be walked any number of times.
///
/// Each call to [`next`](CoroutineStream::next) advances the coroutine by one
/// value and moves it into the thunk of the returned cell's tail.
pub struct CoroutineStream<R> {
    coroutine: Option<BidirectionalCoroutine<R, ()>>,
}

impl<R: 'static> CoroutineStream<R> {
    pub fn new(coroutine: BidirectionalCoroutine<R, ()>) -> Self {
        Self {
            coroutine: Some(coroutine),
        }
    }

    /// Advances the coroutine to its next value.
    ///
    /// A value delivered through `Final` becomes the last cell; a silent return
    /// becomes `Nil`. Bare suspensions are skipped. A coroutine that has already
    /// terminated is not an error: it yields `Nil`, or a single cell if it
    /// handed back a `Final` value that no `resume` has reported yet.
    ///
    /// # Panics
    /// If this adapter has already been advanced.
    pub fn next(&mut self) -> Rc<Stream<R>> {
        let mut coroutine = match self.coroutine.take() {
            Some(coroutine) => coroutine,
            None => panic!("CoroutineStream advanced twice; continue from the stream it returned"),
        };

        loop {
            if !coroutine.is_alive() {
                return match coroutine.take_unreported() {
                    Some(last) => Stream::cell(last, Stream::nil),
                    None => Stream::nil(),
                };
            }
            match coroutine.resume(()) {
                Resumed::Yielded(_) | Resumed::Returned(_) => break,
                Resumed::Suspended => continue,
                Resumed::Complete => return Stream::nil(),
            }
        }

        let head = match coroutine.take_latest() {
            Some(head) => head,
            None => unreachable!("resume reported a value that is not in the result slot"),
        };
        if coroutine.is_alive() {
            let mut rest = CoroutineStream::new(coroutine);
            Stream::cell(head, move || rest.next())
        } else {
            Stream::cell(head, Stream::nil)
        }
    }

    pub fn into_stream(mut self) -> Rc<Stream<R>> {
        self.next()
    }
}

impl<R> fmt::Debug for CoroutineStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineStream")
            .field("consumed", &self.coroutine.is_none())
            .finish()
    }
}
