//! Persistent lazy sequences with memoized tails.
//!
//! Nodes are shared through `Rc`, and a tail is computed at most once no matter
//! how many holders of the node force it, so a single-use producer can back a
//! sequence that is replayed any number of times.

mod adapter;

pub use adapter::CoroutineStream;

use once_cell::unsync::Lazy;
use std::fmt;
use std::mem;
use std::rc::Rc;

type Thunk<T> = Box<dyn FnOnce() -> Rc<Stream<T>>>;

/// A tail computed on first use and cached afterwards.
pub struct Tail<T>(Lazy<Rc<Stream<T>>, Thunk<T>>);

impl<T> Tail<T> {
    fn new(thunk: Thunk<T>) -> Self {
        Self(Lazy::new(thunk))
    }

    /// # Panics
    /// If the thunk forces this same tail, or panicked on an earlier attempt.
    #[inline]
    pub fn force(&self) -> &Rc<Stream<T>> {
        Lazy::force(&self.0)
    }

    #[inline]
    pub fn is_forced(&self) -> bool {
        Lazy::get(&self.0).is_some()
    }

    // swaps a forced tail for a fresh `Nil` so the caller can drop the chain itself
    fn detach(&mut self) -> Option<Rc<Stream<T>>> {
        Lazy::get_mut(&mut self.0).map(|forced| mem::replace(forced, Stream::nil()))
    }
}

pub enum Stream<T> {
    Cell(T, Tail<T>),
    Nil,
}

impl<T> Stream<T> {
    /// Prepends `head` to a tail that `thunk` computes on demand.
    pub fn cell(head: T, thunk: impl FnOnce() -> Rc<Stream<T>> + 'static) -> Rc<Self> {
        Rc::new(Stream::Cell(head, Tail::new(Box::new(thunk))))
    }

    pub fn nil() -> Rc<Self> {
        Rc::new(Stream::Nil)
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Stream::Nil)
    }

    #[inline]
    pub fn head(&self) -> Option<&T> {
        match self {
            Stream::Cell(head, _) => Some(head),
            Stream::Nil => None,
        }
    }

    /// Forces and returns the rest of the sequence; `None` on `Nil`.
    #[inline]
    pub fn tail(&self) -> Option<&Rc<Stream<T>>> {
        match self {
            Stream::Cell(_, tail) => Some(tail.force()),
            Stream::Nil => None,
        }
    }

    /// Iterates over the heads, forcing each tail only when the next item is requested.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            node: Some(self),
            pending: None,
        }
    }
}

impl<T> Drop for Stream<T> {
    fn drop(&mut self) {
        // unlink forced chains iteratively so long sequences do not overflow the stack
        let mut next = match self {
            Stream::Cell(_, tail) => tail.detach(),
            Stream::Nil => None,
        };
        while let Some(node) = next {
            next = match Rc::try_unwrap(node) {
                Ok(mut stream) => match &mut stream {
                    Stream::Cell(_, tail) => tail.detach(),
                    Stream::Nil => None,
                },
                Err(_) => None,
            };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Cell(head, tail) if tail.is_forced() => f
                .debug_tuple("Cell")
                .field(head)
                .field(tail.force())
                .finish(),
            Stream::Cell(head, _) => write!(f, "Cell({head:?}, ..)"),
            Stream::Nil => f.write_str("Nil"),
        }
    }
}

pub struct Iter<'a, T> {
    node: Option<&'a Stream<T>>,
    pending: Option<&'a Tail<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if let Some(tail) = self.pending.take() {
            self.node = Some(&**tail.force());
        }
        match self.node? {
            Stream::Cell(head, tail) => {
                self.pending = Some(tail);
                Some(head)
            }
            Stream::Nil => {
                self.node = None;
                None
            }
        }
    }
}
