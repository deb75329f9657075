use std::ptr::NonNull;

/// Owning pointer to a heap value whose address never changes.
///
/// A coroutine body keeps raw pointers into its handle's hot storage across
/// suspensions. Moving a `Box` would reassert unique ownership of the pointee
/// and invalidate those pointers; moving an `Anchor` only copies the address.
pub(crate) struct Anchor<T>(NonNull<T>);

impl<T> Anchor<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Self(NonNull::from(Box::leak(Box::new(value))))
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> NonNull<T> {
        self.0
    }

    #[inline]
    pub(crate) fn get(&self) -> &T {
        unsafe { self.0.as_ref() }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self) -> &mut T {
        unsafe { self.0.as_mut() }
    }
}

impl<T> Drop for Anchor<T> {
    fn drop(&mut self) {
        drop(unsafe { Box::from_raw(self.0.as_ptr()) });
    }
}
